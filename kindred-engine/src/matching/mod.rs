pub mod ledger;
pub mod scorer;

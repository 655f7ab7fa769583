use chrono::NaiveDate;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Event, User};

/// Check the event's eligibility predicate against a prospective requester.
///
/// Capacity is deliberately not part of this check; requests are non-binding
/// and capacity is enforced when the host accepts.
pub fn check_eligibility(event: &Event, user: &User, today: NaiveDate) -> AppResult<()> {
    if let Some(restriction) = event.gender_restriction.as_deref() {
        match user.gender.as_deref() {
            Some(gender) if gender.eq_ignore_ascii_case(restriction) => {}
            _ => {
                return Err(AppError::new(
                    ErrorCode::NotEligible,
                    format!("this event is restricted to {restriction} participants"),
                ));
            }
        }
    }

    if event.age_min.is_some() || event.age_max.is_some() {
        let age = user.age_on(today).ok_or_else(|| {
            AppError::new(
                ErrorCode::NotEligible,
                "this event has an age restriction and your profile has no birth date",
            )
        })?;

        if let Some(min) = event.age_min {
            if age < min {
                return Err(AppError::new(
                    ErrorCode::NotEligible,
                    format!("this event requires participants to be at least {min}"),
                ));
            }
        }
        if let Some(max) = event.age_max {
            if age > max {
                return Err(AppError::new(
                    ErrorCode::NotEligible,
                    format!("this event requires participants to be at most {max}"),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn event(age_min: Option<i32>, age_max: Option<i32>, gender: Option<&str>) -> Event {
        Event {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            title: "Bouldering".into(),
            description: None,
            starts_at: Utc.with_ymd_and_hms(2030, 1, 1, 18, 0, 0).unwrap(),
            min_participants: 2,
            max_participants: 6,
            status: "open".into(),
            age_min,
            age_max,
            gender_restriction: gender.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(birth_year: Option<i32>, gender: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            display_name: "Sam".into(),
            birth_date: birth_year.map(|y| NaiveDate::from_ymd_opt(y, 6, 15).unwrap()),
            gender: gender.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn unrestricted_event_admits_anyone() {
        assert!(check_eligibility(&event(None, None, None), &user(None, None), today()).is_ok());
    }

    #[test]
    fn age_band_is_inclusive() {
        let e = event(Some(18), Some(35), None);
        assert!(check_eligibility(&e, &user(Some(2000), None), today()).is_ok());
        assert!(check_eligibility(&e, &user(Some(1980), None), today()).is_err());
        assert!(check_eligibility(&e, &user(Some(2010), None), today()).is_err());
    }

    #[test]
    fn age_restriction_requires_known_birth_date() {
        let e = event(Some(18), None, None);
        assert!(check_eligibility(&e, &user(None, None), today()).is_err());
    }

    #[test]
    fn gender_restriction_is_case_insensitive() {
        let e = event(None, None, Some("female"));
        assert!(check_eligibility(&e, &user(None, Some("Female")), today()).is_ok());
        assert!(check_eligibility(&e, &user(None, Some("male")), today()).is_err());
        assert!(check_eligibility(&e, &user(None, None), today()).is_err());
    }
}

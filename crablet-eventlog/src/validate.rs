//! Validation rules an appended batch must satisfy (§4.1).

use crablet_core::{CoreError, NewEvent};

/// An empty batch is a no-op, not a validation failure (§4.1, §8) — callers
/// append it return-immediately before running any per-event rule.
pub fn validate_new_events(events: &[NewEvent]) -> Result<(), CoreError> {
    for event in events {
        if event.event_type.is_empty() {
            return Err(CoreError::Validation("event_type must not be empty".into()));
        }
        for tag in &event.tags {
            if tag.key.is_empty() {
                return Err(CoreError::Validation("tag key must not be empty".into()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crablet_core::Tag;

    #[test]
    fn accepts_empty_batch() {
        assert!(validate_new_events(&[]).is_ok());
    }

    #[test]
    fn rejects_empty_event_type() {
        let events = vec![NewEvent::new("", vec![], vec![])];
        assert!(validate_new_events(&events).is_err());
    }

    #[test]
    fn accepts_well_formed_batch() {
        let events = vec![NewEvent::new(
            "WalletOpened",
            vec![Tag::new("wallet_id", "W1").unwrap()],
            b"{}".to_vec(),
        )];
        assert!(validate_new_events(&events).is_ok());
    }
}

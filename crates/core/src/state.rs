//! Explicit status transition tables.
//!
//! Each lifecycle enum lists its allowed targets in one place and every
//! transition goes through [`StateMachine::ensure_transition`].

use crate::error::{DomainError, DomainResult};

pub trait StateMachine: Copy + Eq + core::fmt::Display + 'static {
    /// Entity name used in error messages (e.g. "order").
    const ENTITY: &'static str;

    /// Statuses reachable in one step from `self`.
    fn allowed_targets(self) -> &'static [Self];

    fn can_transition_to(self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Shared guard: `Ok` iff `(self, target)` is in the table.
    fn ensure_transition(self, target: Self) -> DomainResult<()> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::invalid_state(
                Self::ENTITY,
                self,
                format!("transition to {target}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    impl core::fmt::Display for Light {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.write_str(match self {
                Light::Red => "RED",
                Light::Green => "GREEN",
                Light::Off => "OFF",
            })
        }
    }

    impl StateMachine for Light {
        const ENTITY: &'static str = "light";

        fn allowed_targets(self) -> &'static [Self] {
            match self {
                Light::Red => &[Light::Green, Light::Off],
                Light::Green => &[Light::Red],
                Light::Off => &[],
            }
        }
    }

    #[test]
    fn guard_follows_table() {
        assert!(Light::Red.ensure_transition(Light::Green).is_ok());
        assert!(Light::Off.is_terminal());

        let err = Light::Green.ensure_transition(Light::Off).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidState {
                entity: "light",
                current: "GREEN".to_string(),
                attempted: "transition to OFF".to_string(),
            }
        );
    }
}

//! Migration step definition and naming.

use futures_util::future::BoxFuture;
use sqlx_postgres::PgConnection;

/// Outcome of a step's up or down procedure.
pub type StepResult = std::result::Result<(), sqlx_core::error::Error>;

/// A step procedure bound to the step's transaction.
///
/// The transaction connection is an explicit parameter; procedures hold no
/// state of their own.
pub type StepProc = for<'c> fn(&'c mut PgConnection) -> BoxFuture<'c, StepResult>;

/// A single schema change: paired up/down procedures with a stable name.
///
/// The ledger key is the snake_case form of the declared up-procedure
/// identifier, so `"CreateUsersTable"` is recorded as `create_users_table`.
#[derive(Clone)]
pub struct MigrationStep {
    name: String,
    up_fx: String,
    down_fx: String,
    up: StepProc,
    down: StepProc,
}

impl MigrationStep {
    /// Builds a step from its declared procedure identifiers.
    #[must_use]
    pub fn new(up_fx: &str, down_fx: &str, up: StepProc, down: StepProc) -> Self {
        Self {
            name: to_snake_case(up_fx),
            up_fx: up_fx.to_string(),
            down_fx: down_fx.to_string(),
            up,
            down,
        }
    }

    /// Ledger key for this step.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared up-procedure identifier, recorded for audit.
    #[must_use]
    pub fn up_fx(&self) -> &str {
        &self.up_fx
    }

    /// Declared down-procedure identifier, recorded for audit.
    #[must_use]
    pub fn down_fx(&self) -> &str {
        &self.down_fx
    }

    /// The forward procedure.
    #[must_use]
    pub fn up(&self) -> StepProc {
        self.up
    }

    /// The reversing procedure.
    #[must_use]
    pub fn down(&self) -> StepProc {
        self.down
    }
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("name", &self.name)
            .field("up_fx", &self.up_fx)
            .field("down_fx", &self.down_fx)
            .finish_non_exhaustive()
    }
}

/// Converts a camel-case identifier to lowercase snake_case.
///
/// An underscore is inserted before an uppercase letter that follows a
/// lowercase letter or digit, and before the last letter of an uppercase run
/// followed by lowercase (`ParseHTTPResponse` becomes
/// `parse_http_response`).
#[must_use]
pub fn to_snake_case(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        for lower in c.to_lowercase() {
            out.push(lower);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("CreateUsersTable"), "create_users_table");
        assert_eq!(to_snake_case("DropUsersTable"), "drop_users_table");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("ParseHTTPResponse"), "parse_http_response");
        assert_eq!(to_snake_case("Step2Cleanup"), "step2_cleanup");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn test_step_name_derived_from_up() {
        fn nop(conn: &mut PgConnection) -> futures_util::future::BoxFuture<'_, StepResult> {
            let _ = conn;
            Box::pin(async { Ok(()) })
        }

        let step = MigrationStep::new("CreateUsersTable", "DropUsersTable", nop, nop);
        assert_eq!(step.name(), "create_users_table");
        assert_eq!(step.up_fx(), "CreateUsersTable");
        assert_eq!(step.down_fx(), "DropUsersTable");
    }
}

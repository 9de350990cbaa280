use serde::Serialize;

/// BIDS naming entities attached to a series or object
///
/// Every entity is optional; `None` serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Entities {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub run: Option<String>,
    pub task: Option<String>,
    pub direction: Option<String>,
    pub acquisition: Option<String>,
    pub ceagent: Option<String>,
    pub echo: Option<String>,
    pub fa: Option<String>,
    pub inversion: Option<String>,
    pub part: Option<String>,
}

impl Entities {
    /// Returns true when no entity is set
    pub fn is_empty(&self) -> bool {
        *self == Entities::default()
    }

    /// Sets the echo entity from an `EchoNumber`, ignoring zero
    pub fn set_echo_number(&mut self, echo_number: Option<i64>) {
        if let Some(n) = echo_number.filter(|n| *n != 0) {
            self.echo = Some(n.to_string());
        }
    }
}

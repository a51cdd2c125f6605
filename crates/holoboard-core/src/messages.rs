use serde::{Deserialize, Serialize};

/// User visible strings; `{0}` is replaced with the argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub unable_to_execute: String,
    pub capture_unavailable: String,
    pub refresh_all: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            unable_to_execute: "unable to execute: {0}".to_string(),
            capture_unavailable: "unable to execute: {0} (no actor available)".to_string(),
            refresh_all: "Refreshed {0} boards".to_string(),
        }
    }
}

impl Messages {
    pub fn format(template: &str, arg: &str) -> String {
        template.replace("{0}", arg)
    }

    pub fn unable_to_execute(&self, command: &str) -> String {
        Self::format(&self.unable_to_execute, command)
    }

    pub fn capture_unavailable(&self, command: &str) -> String {
        Self::format(&self.capture_unavailable, command)
    }

    pub fn refresh_all(&self, count: usize) -> String {
        Self::format(&self.refresh_all, &count.to_string())
    }
}

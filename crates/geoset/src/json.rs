//! JSON envelope for `--json` output

use serde::Serialize;

/// `{"$schema": "geoset://<kind>/v1", "success": true, ...data}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(kind: &str, data: T) -> Self {
        Self {
            schema: format!("geoset://{kind}/v1"),
            success: true,
            data,
        }
    }

    pub const fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

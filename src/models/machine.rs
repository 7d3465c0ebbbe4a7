use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineRecord {
    pub id: i64,
    pub name: String,
    /// Free text; `None` groups the machine under the "no category" bucket.
    pub category: Option<String>,
}

impl MachineRecord {
    /// Blank categories count as missing.
    pub fn category_name(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

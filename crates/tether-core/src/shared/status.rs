use serde::{Deserialize, Serialize};

/// PtrStatus はハンドルから見た所有状態のスナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtrStatus {
    pub use_count: usize,
    pub weak_count: usize,
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_serializes_as_flat_object() {
        let status = PtrStatus {
            use_count: 2,
            weak_count: 1,
            expired: false,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({ "use_count": 2, "weak_count": 1, "expired": false })
        );
    }
}

use crate::types::{NamespacedTable, SourceTable};
use std::path::Path;

/// Name of the session directory that owns `input_dir`
/// (`.../Test_01/Flight_Data` -> `Test_01`). Empty when there is none.
pub fn run_identifier(input_dir: &Path) -> String {
    input_dir
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `{source_id}_{column}` with every `{run_id}_` removed.
pub fn namespaced_column(source_id: &str, column: &str, run_id: &str) -> String {
    let name = format!("{source_id}_{column}");
    if run_id.is_empty() {
        return name;
    }
    name.replace(&format!("{run_id}_"), "")
}

/// Rewrite every column of `table` into the global namespace.
///
/// Two sources may still end up with the same column name after the run id
/// is stripped. That is left as is here; the merger reports it.
pub fn namespace(table: SourceTable, run_id: &str) -> NamespacedTable {
    let columns = table
        .columns
        .iter()
        .map(|c| namespaced_column(&table.source_id, c, run_id))
        .collect();
    NamespacedTable {
        source_id: table.source_id,
        columns,
        rows: table.rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;
    use std::path::PathBuf;

    #[test]
    fn test_run_identifier_is_parent_dir_name() {
        let dir = PathBuf::from("/data/Test_01/Flight_Data");
        assert_eq!(run_identifier(&dir), "Test_01");
        assert_eq!(run_identifier(&PathBuf::from("/")), "");
    }

    #[test]
    fn test_prefix_and_strip_run_id() {
        assert_eq!(
            namespaced_column("Test_01_vehicle_attitude_0", "q[0]", "Test_01"),
            "vehicle_attitude_0_q[0]"
        );
        assert_eq!(namespaced_column("accel", "x", "Test_01"), "accel_x");
        assert_eq!(namespaced_column("accel", "x", ""), "accel_x");
    }

    #[test]
    fn test_strip_removes_every_occurrence() {
        assert_eq!(namespaced_column("T_a_T_b", "T_c", "T"), "a_b_c");
    }

    #[test]
    fn test_namespace_keeps_rows() {
        let table = SourceTable {
            source_id: "gyro".into(),
            columns: vec!["r".into(), "p".into()],
            rows: vec![Row::new(5, vec![Some(1.0), None])],
        };
        let ns = namespace(table, "Test_01");
        assert_eq!(ns.columns, vec!["gyro_r", "gyro_p"]);
        assert_eq!(ns.rows[0].cells, vec![Some(1.0), None]);
        assert_eq!(ns.source_id, "gyro");
    }
}

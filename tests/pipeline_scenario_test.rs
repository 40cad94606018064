use anyhow::Result;
use flight_aligner::error::{AlignError, EmptyInputCause};
use flight_aligner::pipeline::ingestion::{discover_sources, load_sources};
use flight_aligner::pipeline::processing::merge::merge;
use flight_aligner::pipeline::processing::namespace::{namespace, run_identifier};
use flight_aligner::pipeline::processing::normalize::normalize;
use flight_aligner::pipeline::processing::resample::{resample, FixedPeriod, MinimumGapPeriod};
use flight_aligner::pipeline::{Pipeline, PipelineOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// `<tmp>/Test_01/Flight_Data` holding the three-source scenario.
fn scenario_dir() -> Result<(TempDir, PathBuf)> {
    let root = tempdir()?;
    let input = root.path().join("Test_01").join("Flight_Data");
    fs::create_dir_all(&input)?;
    fs::write(input.join("accel.csv"), "timestamp,x\n0,100\n10,1\n30,3\n")?;
    fs::write(input.join("gyro.csv"), "timestamp,r\n5,0.5\n15,1.5\n")?;
    fs::write(input.join("telemetry_status.csv"), "timestamp,s\n0,7\n20,8\n")?;
    Ok((root, input))
}

fn options(period: i64) -> PipelineOptions {
    PipelineOptions {
        exclude: vec!["telemetry_status".to_string()],
        period_policy: Arc::new(FixedPeriod(period)),
        output_dir_name: "combined".to_string(),
        output_suffix: "_combined".to_string(),
    }
}

#[test]
fn test_three_source_scenario_stage_by_stage() -> Result<()> {
    let (_root, input) = scenario_dir()?;
    let run_id = run_identifier(&input);
    assert_eq!(run_id, "Test_01");

    let sources = load_sources(&discover_sources(&input)?)?;
    let namespaced = sources.into_iter().map(|s| namespace(s, &run_id)).collect();
    let merged = merge(namespaced, &["telemetry_status".to_string()])?;
    assert_eq!(merged.columns, vec!["accel_x", "gyro_r"]);
    assert_eq!(merged.excluded, vec!["telemetry_status"]);

    let normalized = normalize(merged)?;
    assert_eq!(normalized.timestamps, vec![0, 5, 10, 25]);
    assert_eq!(normalized.stats.sentinel_rows_dropped, 1);
    // gyro_r defined from the start, accel_x zero until its first real sample
    assert_eq!(
        normalized.rows,
        vec![
            vec![0.0, 0.5],
            vec![1.0, 0.5],
            vec![1.0, 1.5],
            vec![3.0, 1.5],
        ]
    );

    let resampled = resample(&normalized, 5)?;
    let index: Vec<i64> = resampled.index().collect();
    assert_eq!(index, vec![0, 5, 10, 15, 20, 25]);
    assert_eq!(resampled.column("accel_x").unwrap(), vec![0.0, 1.0, 1.0, 1.0, 1.0, 3.0]);
    assert_eq!(resampled.column("gyro_r").unwrap(), vec![0.5, 0.5, 1.5, 1.5, 1.5, 1.5]);
    Ok(())
}

#[test]
fn test_session_core_writes_combined_csv() -> Result<()> {
    let (_root, input) = scenario_dir()?;

    let result = Pipeline::run_session_core(&input, "Test_01", &options(5))?;
    assert_eq!(result.output_file, input.join("combined").join("Test_01_combined.csv"));
    assert_eq!(result.sources_loaded, 2);
    assert_eq!(result.sources_excluded, vec!["telemetry_status"]);
    assert_eq!(result.resampled_rows, 6);
    assert!(result.collisions.is_empty());

    let body = fs::read_to_string(&result.output_file)?;
    assert_eq!(
        body,
        "cpu_time,accel_x,gyro_r\n0,0,0.5\n5,1,0.5\n10,1,1.5\n15,1,1.5\n20,1,1.5\n25,3,1.5\n"
    );
    Ok(())
}

#[test]
fn test_second_run_does_not_ingest_its_own_output() -> Result<()> {
    let (_root, input) = scenario_dir()?;

    let first = Pipeline::run_session_core(&input, "Test_01", &options(5))?;
    let first_body = fs::read_to_string(&first.output_file)?;
    let second = Pipeline::run_session_core(&input, "Test_01", &options(5))?;
    let second_body = fs::read_to_string(&second.output_file)?;

    assert_eq!(first_body, second_body);
    assert_eq!(second.sources_loaded, 2);
    Ok(())
}

#[test]
fn test_run_identifier_stripped_from_prefixed_sources() -> Result<()> {
    let root = tempdir()?;
    let input = root.path().join("log_3").join("Flight_Data");
    fs::create_dir_all(&input)?;
    fs::write(input.join("log_3_vehicle_attitude_0.csv"), "timestamp,q[0]\n10,1\n20,2\n")?;
    fs::write(input.join("log_3_sensor_combined_0.csv"), "timestamp,gyro_rad[0]\n15,4\n")?;

    let result = Pipeline::run_session_core(&input, "log_3", &options(4000))?;
    let body = fs::read_to_string(&result.output_file)?;
    let header = body.lines().next().unwrap();
    assert_eq!(header, "cpu_time,sensor_combined_0_gyro_rad[0],vehicle_attitude_0_q[0]");
    Ok(())
}

#[test]
fn test_collision_reported_and_values_interleave() -> Result<()> {
    let root = tempdir()?;
    let input = root.path().join("T").join("data");
    fs::create_dir_all(&input)?;
    // Both rename to imu_0_x once "T_" is stripped
    fs::write(input.join("T_imu_0.csv"), "timestamp,x\n10,1\n30,3\n")?;
    fs::write(input.join("imu_0.csv"), "timestamp,x\n20,2\n")?;

    let result = Pipeline::run_session_core(&input, "T", &options(10))?;
    assert_eq!(
        result.collisions.get("imu_0_x"),
        Some(&vec!["T_imu_0".to_string(), "imu_0".to_string()])
    );
    let body = fs::read_to_string(&result.output_file)?;
    assert_eq!(body, "cpu_time,imu_0_x\n0,1\n10,2\n20,3\n");
    Ok(())
}

#[test]
fn test_only_sentinel_rows_is_empty_input() -> Result<()> {
    let root = tempdir()?;
    let input = root.path().join("S").join("data");
    fs::create_dir_all(&input)?;
    fs::write(input.join("a.csv"), "timestamp,x\n0,1\n0,2\n")?;

    let err = Pipeline::run_session_core(&input, "S", &options(10)).unwrap_err();
    assert!(matches!(err, AlignError::EmptyInput(EmptyInputCause::AllSentinel)));
    assert_eq!(err.stage(), "normalize");
    assert!(!input.join("combined").exists());
    Ok(())
}

#[test]
fn test_min_gap_policy_drives_grid() -> Result<()> {
    let (_root, input) = scenario_dir()?;
    let mut opts = options(4000);
    opts.period_policy = Arc::new(MinimumGapPeriod { fallback: 4000 });

    let result = Pipeline::run_session_core(&input, "Test_01", &opts)?;
    // accel gaps 20, gyro gap 10; sentinel ignored
    assert_eq!(result.period_micros, 10);
    assert_eq!(result.resampled_rows, 3);
    assert_eq!(result.period_policy, "min_gap");
    Ok(())
}

fn grid_is_regular(path: &Path, period: i64) -> Result<bool> {
    let body = fs::read_to_string(path)?;
    let index: Vec<i64> = body
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap().parse().unwrap())
        .collect();
    Ok(index.first() == Some(&0) && index.windows(2).all(|w| w[1] - w[0] == period))
}

#[test]
fn test_default_period_grid_regularity() -> Result<()> {
    let root = tempdir()?;
    let input = root.path().join("R").join("data");
    fs::create_dir_all(&input)?;
    let mut body = String::from("timestamp,v\n");
    for i in 0..200 {
        body.push_str(&format!("{},{}\n", 1_000_000 + i * 1_337, i));
    }
    fs::write(input.join("irregular.csv"), body)?;

    let result = Pipeline::run_session_core(&input, "R", &options(4000))?;
    assert!(grid_is_regular(&result.output_file, 4000)?);
    // 199 * 1337 = 266063 -> 66 full periods plus the origin
    assert_eq!(result.resampled_rows, 67);
    Ok(())
}

#[test]
fn test_nan_cells_carry_last_value_into_output() -> Result<()> {
    let root = tempdir()?;
    let input = root.path().join("N").join("data");
    fs::create_dir_all(&input)?;
    fs::write(input.join("a.csv"), "timestamp,x,y\n10,1.5,nan\n20,nan,4\n30,2.5,NaN\n")?;

    let result = Pipeline::run_session_core(&input, "N", &options(10))?;
    let body = fs::read_to_string(&result.output_file)?;
    assert_eq!(body, "cpu_time,a_x,a_y\n0,1.5,0\n10,1.5,4\n20,2.5,4\n");
    assert!(!body.contains("NaN"));
    Ok(())
}

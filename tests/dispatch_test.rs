use sweep::{
    Axis, DispatchReport, Dispatcher, DryRunExecutor, Grid, Outcome, ParamTuple,
    RecordingExecutor, SubmitTemplate, SweepError,
};

fn dispatch(
    grid: Grid,
    executor: RecordingExecutor,
) -> (Result<DispatchReport, SweepError>, RecordingExecutor) {
    let mut dispatcher = Dispatcher::new(SubmitTemplate::default(), executor);
    let result = dispatcher.dispatch(grid);
    (result, dispatcher.into_executor())
}

#[test]
fn test_empty_grid_makes_no_calls() {
    let (result, exec) = dispatch(Grid::default(), RecordingExecutor::new());

    let report = result.expect("empty grid is not an error");
    assert!(report.is_empty());
    assert!(exec.commands().is_empty());
}

#[test]
fn test_three_points_in_order() {
    let grid = Grid::from_tuples(vec![
        ParamTuple::new(1, 1, 1),
        ParamTuple::new(2, 2, 2),
        ParamTuple::new(3, 3, 3),
    ]);
    let (result, exec) = dispatch(grid, RecordingExecutor::new());
    let report = result.unwrap();

    assert_eq!(report.len(), 3);
    let lines = exec.command_lines();
    assert_eq!(lines.len(), 3);
    for (line, suffix) in lines.iter().zip(["1-1-1", "2-2-2", "3-3-3"]) {
        assert!(line.contains(&format!("-oo log_{suffix}.txt")), "{line}");
    }
    assert_ne!(lines[0], lines[1]);
    assert_ne!(lines[1], lines[2]);

    let logs: Vec<&str> = report.iter().map(|s| s.log_file.as_str()).collect();
    assert_eq!(logs, ["log_1-1-1.txt", "log_2-2-2.txt", "log_3-3-3.txt"]);
}

#[test]
fn test_one_call_per_point_including_duplicates() {
    let axis = Axis::parse_list("0.1,0.1");
    let grid = Grid::product(&axis, &Axis::parse_list("2"), &Axis::parse_list("0.05,0.5"));
    assert_eq!(grid.len(), 4);

    let (result, exec) = dispatch(grid.clone(), RecordingExecutor::new());
    assert_eq!(result.unwrap().len(), 4);

    let expected: Vec<String> = grid
        .iter()
        .map(|p| SubmitTemplate::default().build(p).command_line())
        .collect();
    assert_eq!(exec.command_lines(), expected, "no deduplication, grid order kept");
}

#[test]
fn test_non_zero_exit_does_not_stop_the_sweep() {
    let grid = Grid::from_tuples(vec![
        ParamTuple::new(1, 1, 1),
        ParamTuple::new(2, 2, 2),
        ParamTuple::new(3, 3, 3),
    ]);
    let exec = RecordingExecutor::new().with_exit_codes(vec![0, 255, 0]);
    let (result, exec) = dispatch(grid, exec);
    let report = result.unwrap();

    assert_eq!(exec.commands().len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    let outcomes: Vec<Outcome> = report.iter().map(|s| s.outcome).collect();
    assert_eq!(outcomes, [Outcome::Exited(0), Outcome::Exited(255), Outcome::Exited(0)]);
}

#[test]
fn test_launch_failure_aborts() {
    let grid = Grid::from_tuples(vec![
        ParamTuple::new(1, 1, 1),
        ParamTuple::new(2, 2, 2),
        ParamTuple::new(3, 3, 3),
    ]);
    let (result, exec) = dispatch(grid, RecordingExecutor::new().failing_at(1));

    let err = result.unwrap_err();
    assert!(matches!(err.cause(), SweepError::Spawn { program, .. } if program == "bsub"));
    assert_eq!(exec.commands().len(), 1, "nothing after the failed launch");

    let partial = err.partial_report().expect("submissions before the failure are kept");
    assert_eq!(partial.len(), 1);
    assert_eq!(partial.iter().next().unwrap().log_file, "log_1-1-1.txt");
    assert!(err
        .to_string()
        .starts_with("sweep stopped after 1 submission(s): failed to launch `bsub`"));
}

#[test]
fn test_dry_run_prints_each_command() {
    let grid = Grid::from_tuples(vec![
        ParamTuple::new(0.1, 2, 0.05),
        ParamTuple::new(0.2, 2, 0.05),
    ]);
    let mut dispatcher =
        Dispatcher::new(SubmitTemplate::default(), DryRunExecutor::new(Vec::new()));
    let report = dispatcher.dispatch(grid).unwrap();
    assert_eq!(report.succeeded(), 2);

    let out = String::from_utf8(dispatcher.into_executor().into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "bsub -W 48:00 -n 36 -R \"rusage[mem=2000]\" -R fullnode -oo log_0.1-2-0.05.txt \
         python results_psd_with_augmentation.py 0.1 2 0.05"
    );
    assert!(lines[1].contains("log_0.2-2-0.05.txt"));
}

#[test]
fn test_manifest() {
    let grid = Grid::from_tuples(vec![
        ParamTuple::new(0.1, 2, 0.05),
        ParamTuple::new(0.2, 2, 0.05),
    ]);
    let exec = RecordingExecutor::new().with_exit_codes(vec![0, 1]);
    let (result, _) = dispatch(grid, exec);

    let mut buf = Vec::new();
    result.unwrap().write_manifest(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let rows: Vec<&str> = text.lines().collect();

    assert_eq!(rows[0], "sigma,order,sigma_noise,log_file,exit_code,command");
    assert!(rows[1].starts_with("0.1,2,0.05,log_0.1-2-0.05.txt,0,"));
    assert!(rows[2].starts_with("0.2,2,0.05,log_0.2-2-0.05.txt,1,"));
    assert_eq!(rows.len(), 3);
}

#[cfg(unix)]
#[test]
fn test_process_executor_reports_exit_code_and_missing_program() {
    use sweep::{CommandExecutor, JobCommand, ProcessExecutor};

    let mut exec = ProcessExecutor::new();
    let ok = exec
        .execute(&JobCommand { program: "true".into(), args: vec![] })
        .unwrap();
    assert_eq!(ok, Outcome::Exited(0));

    let fail = exec
        .execute(&JobCommand { program: "false".into(), args: vec![] })
        .unwrap();
    assert_eq!(fail, Outcome::Exited(1));

    let missing = exec.execute(&JobCommand {
        program: "definitely-not-a-scheduler-binary".into(),
        args: vec![],
    });
    assert!(matches!(missing, Err(SweepError::Spawn { .. })));
}

struct BrokenPipe;

impl std::io::Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_dry_run_write_error_is_not_a_launch_failure() {
    let grid = Grid::from_tuples(vec![ParamTuple::new(1, 1, 1), ParamTuple::new(2, 2, 2)]);
    let mut dispatcher =
        Dispatcher::new(SubmitTemplate::default(), DryRunExecutor::new(BrokenPipe));

    let err = dispatcher.dispatch(grid).unwrap_err();
    assert!(matches!(err.cause(), SweepError::Io(_)), "{err}");
    assert_eq!(err.partial_report().map(|r| r.len()), Some(0));
    assert!(!err.to_string().contains("failed to launch"));
}

use assert_cmd::Command;

#[test]
fn refuses_to_start_without_a_tty() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("trivia")?.write_stdin("").output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stdin must be a tty"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn help_lists_round_options() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("trivia")?.arg("--help").output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--category"));
    assert!(stdout.contains("--difficulty"));
    assert!(stdout.contains("--format"));
    Ok(())
}

#[test]
fn unknown_category_is_rejected_before_startup() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("trivia")?
        .args(["--category", "Cooking"])
        .write_stdin("")
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cooking"), "stderr was: {stderr}");
    Ok(())
}

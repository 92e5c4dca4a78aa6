use std::fs;
use std::path::Path;
use tempfile::TempDir;
use xcollect_core::{
    FilterMode, FilterPolicy, NullSink, RunEvent, RunRequest, run_collection, select,
};

fn write_bytes(base: &Path, rel: &str, contents: &[u8]) {
    let path = base.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn scenario_policy() -> FilterPolicy {
    FilterPolicy::new(FilterMode::IncludeList, ["py"], ["png"], [".git"])
}

#[test]
fn python_only_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("repo");
    write_bytes(&src, "a.py", b"def main():\n    return 42\n");
    write_bytes(&src, "b.png", b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR");
    write_bytes(&src, ".git/config", b"[core]\n");
    let output = temp_dir.path().join("collected.txt");

    let selected = select(&src, &scenario_policy(), Some(&output)).unwrap();
    let names: Vec<String> = selected.iter().map(|f| f.relative_display()).collect();
    assert_eq!(names, vec!["a.py"]);

    let request = RunRequest::new(&src, &output).with_policy(scenario_policy());
    let result = run_collection(&request, &mut NullSink).unwrap();
    assert_eq!(result.files_written, 1);
    assert_eq!(result.failure_count, 0);

    let doc = fs::read_to_string(&output).unwrap();
    assert!(doc.contains("Collected 1 files matching criteria"));
    assert_eq!(doc.matches("==== FILE:").count(), 1);
    assert!(doc.contains("==== FILE: a.py [py] ====\n\ndef main():\n    return 42\n"));
    assert!(doc.contains("Task Prompt: (Not provided)"));
    assert!(!doc.contains("[core]"));
}

#[test]
fn count_line_matches_headers() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("repo");
    write_bytes(&src, "README", b"readme");
    write_bytes(&src, "src/lib.rs", b"pub fn f() {}");
    write_bytes(&src, "src/data.bin", b"\x00\x01\x02");
    write_bytes(&src, "docs/guide.md", b"# Guide");
    let output = temp_dir.path().join("collected.txt");

    let policy = FilterPolicy::new(FilterMode::AllText, [""; 0], ["bin"], [""; 0]);
    let request = RunRequest::new(&src, &output).with_policy(policy);
    let result = run_collection(&request, &mut NullSink).unwrap();

    let doc = fs::read_to_string(&output).unwrap();
    assert_eq!(result.files_written, 3);
    assert!(doc.contains(&format!(
        "Collected {} files matching criteria:",
        result.files_written
    )));
    assert_eq!(doc.matches("==== FILE:").count(), result.files_written);
    assert!(doc.contains("==== FILE: README [no extension] ===="));
}

#[test]
fn reruns_are_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("repo");
    write_bytes(&src, "z.txt", b"last");
    write_bytes(&src, "a/one.txt", b"first");
    write_bytes(&src, "legacy.txt", b"r\xe9sum\xe9");
    let first_out = temp_dir.path().join("first.txt");
    let second_out = temp_dir.path().join("second.txt");

    let request = RunRequest::new(&src, &first_out).with_prompt("Same prompt");
    run_collection(&request, &mut NullSink).unwrap();
    let mut again = request.clone();
    again.output_path = second_out.clone();
    run_collection(&again, &mut NullSink).unwrap();

    assert_eq!(fs::read(&first_out).unwrap(), fs::read(&second_out).unwrap());
}

#[test]
fn fallback_and_binary_scenarios() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("repo");
    write_bytes(&src, "latin.txt", b"Gr\xfc\xdfe aus K\xf6ln");
    let mut nul_text = b"looks like text".to_vec();
    nul_text.push(0);
    nul_text.extend_from_slice(b" but is not");
    write_bytes(&src, "sneaky.txt", &nul_text);
    let output = temp_dir.path().join("collected.txt");

    let result = run_collection(&RunRequest::new(&src, &output), &mut NullSink).unwrap();
    assert_eq!(result.files_written, 2);
    assert_eq!(result.failure_count, 1);

    let doc = fs::read_to_string(&output).unwrap();
    assert!(doc.contains("==== FILE: latin.txt [txt] ====\n\nGrüße aus Köln\n\n"));
    assert!(doc.contains("==== FILE: sneaky.txt [txt] ====\n\n[Read Error: "));
    assert!(!doc.contains("looks like text"));
}

#[test]
fn progress_is_monotonic_and_terminal_event_is_last() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("repo");
    for i in 0..5 {
        write_bytes(&src, &format!("f{i}.txt"), b"x");
    }
    let output = temp_dir.path().join("collected.txt");

    let handle = xcollect_core::spawn_collection(RunRequest::new(&src, &output)).unwrap();
    let events: Vec<RunEvent> = handle.events().collect();
    handle.join().unwrap();

    let fractions: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress { completed, total } => {
                Some(xcollect_core::progress::fraction(*completed, *total))
            }
            _ => None,
        })
        .collect();
    assert_eq!(fractions.len(), 5);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.last().copied(), Some(1.0));
    assert!(matches!(events.last(), Some(RunEvent::Completed(_))));
}

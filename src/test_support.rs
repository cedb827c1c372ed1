//! Test step reporting used by the crate's tests.
//!
//! Tests build a [`TestReport`] through the [`test_report!`] macro, narrate
//! setup and actions, and assert through it. When the report drops it
//! writes a plain-text step log into `TEST_REPORT_DIR` if that variable is
//! set; without it the harness only enforces the assertions.

use std::fmt::{Debug, Display};
use std::path::PathBuf;
use std::sync::Mutex;

/// Build a [`TestReport`] named after the enclosing test function.
#[macro_export]
macro_rules! test_report {
    ($title:expr) => {{
        fn here() {}
        fn name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let path = name_of(here).trim_end_matches("::here");
        // Async tests wrap the body in a closure frame.
        let path = path.trim_end_matches("::{{closure}}");
        $crate::test_support::TestReport::new(path, $title, file!(), line!())
    }};
}

enum StepKind {
    Setup,
    Action,
    Pass,
    Fail,
}

impl StepKind {
    fn label(&self) -> &'static str {
        match self {
            StepKind::Setup => "setup",
            StepKind::Action => "action",
            StepKind::Pass => "pass",
            StepKind::Fail => "FAIL",
        }
    }
}

struct Step {
    kind: StepKind,
    detail: String,
}

/// Step recorder for one test; written out on drop.
pub struct TestReport {
    path: String,
    title: String,
    source: String,
    steps: Mutex<Vec<Step>>,
    out_dir: Option<PathBuf>,
}

impl TestReport {
    pub fn new(path: &str, title: &str, file: &str, line: u32) -> Self {
        Self {
            path: path.to_string(),
            title: title.to_string(),
            source: format!("{}:{}", file, line),
            steps: Mutex::new(Vec::new()),
            out_dir: std::env::var("TEST_REPORT_DIR").ok().map(PathBuf::from),
        }
    }

    /// Narrate a setup step.
    pub fn setup(&self, msg: impl Display) {
        self.push(StepKind::Setup, msg.to_string());
    }

    /// Narrate the action under test.
    pub fn action(&self, msg: impl Display) {
        self.push(StepKind::Action, msg.to_string());
    }

    pub fn assert_eq<A, E>(&self, label: &str, actual: &A, expected: &E)
    where
        A: PartialEq<E> + Debug,
        E: Debug,
    {
        let ok = actual == expected;
        let detail = format!(
            "{}: {} == {}",
            label,
            clip(&format!("{:?}", actual)),
            clip(&format!("{:?}", expected))
        );
        self.record(ok, detail);
        assert_eq!(actual, expected, "{}", label);
    }

    pub fn assert_true(&self, label: &str, value: bool) {
        self.record(value, format!("{}: {}", label, value));
        assert!(value, "{}", label);
    }

    pub fn assert_contains(&self, label: &str, haystack: &str, needle: &str) {
        let ok = haystack.contains(needle);
        self.record(
            ok,
            format!("{}: {} contains {}", label, clip(haystack), clip(needle)),
        );
        assert!(
            ok,
            "{}: {:?} does not contain {:?}",
            label, haystack, needle
        );
    }

    fn push(&self, kind: StepKind, detail: String) {
        self.steps.lock().unwrap().push(Step { kind, detail });
    }

    fn record(&self, ok: bool, detail: String) {
        self.push(if ok { StepKind::Pass } else { StepKind::Fail }, detail);
    }

    fn write(&self) {
        let Some(dir) = &self.out_dir else { return };
        let result = if std::thread::panicking() {
            "FAIL"
        } else {
            "pass"
        };

        let steps = self.steps.lock().unwrap();
        let mut text = String::new();
        text.push_str(&format!("test: {}\n", self.path));
        text.push_str(&format!("title: {}\n", self.title));
        text.push_str(&format!("at: {}\n", self.source));
        for step in steps.iter() {
            text.push_str(&format!("  {}: {}\n", step.kind.label(), step.detail));
        }
        text.push_str(&format!("result: {}\n", result));

        let file = dir.join(format!("{}.txt", self.path.replace("::", "__")));
        let _ = std::fs::create_dir_all(dir);
        let _ = std::fs::write(file, text);
    }
}

impl Drop for TestReport {
    fn drop(&mut self) {
        self.write();
    }
}

const CLIP_AT: usize = 600;

/// Shorten long debug strings so report files stay readable.
fn clip(s: &str) -> String {
    if s.len() <= CLIP_AT {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .take_while(|(i, _)| *i <= CLIP_AT)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{}... ({} bytes)", &s[..cut], s.len())
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use quill_common::RenderConfig;
use quill_renderer::html::HighlightCode;
use quill_renderer::{
    BuiltinModules, LoadError, ModuleSource, PipelineModules, Preview, Processor,
    RENDER_ERROR_HTML, RenderError, RenderResult,
};
use tokio::sync::oneshot;

fn builtin() -> BuiltinModules {
    BuiltinModules::new(RenderConfig {
        highlight_code: false,
        ..Default::default()
    })
}

fn processor() -> Arc<Processor> {
    Arc::new(Processor::new(builtin()))
}

/// Fails until `fail` is cleared.
struct Switchable {
    fail: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ModuleSource for Switchable {
    async fn load(&self) -> Result<PipelineModules, LoadError> {
        if self.fail.load(Ordering::SeqCst) > 0 {
            return Err(LoadError::new("offline"));
        }
        builtin().load_now()
    }
}

/// Blocks the first load until the test releases it.
struct Gated {
    gate: std::sync::Mutex<Option<oneshot::Receiver<()>>>,
}

#[async_trait::async_trait]
impl ModuleSource for Gated {
    async fn load(&self) -> Result<PipelineModules, LoadError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        builtin().load_now()
    }
}

/// Highlights nothing, and panics on `crash` blocks.
struct Crashing;

impl HighlightCode for Crashing {
    fn highlight(&self, language: &str, _code: &str) -> Option<String> {
        if language == "crash" {
            panic!("highlighter fell over");
        }
        None
    }
}

/// Built-in modules with the crashing highlighter.
struct CrashingHighlighter;

#[async_trait::async_trait]
impl ModuleSource for CrashingHighlighter {
    async fn load(&self) -> Result<PipelineModules, LoadError> {
        let mut modules = builtin().load_now()?;
        modules.highlighter = Some(Box::new(Crashing));
        Ok(modules)
    }
}

#[tokio::test]
async fn script_tags_never_survive() {
    let processor = processor();
    for input in [
        "<script>alert(1)</script>",
        "hello <script>alert(1)</script> world",
        "<div><script>alert(1)</script></div>",
        "<SCRIPT SRC=//evil.example/x.js></SCRIPT>",
    ] {
        let html = processor.process(input).await.unwrap();
        assert!(!html.to_lowercase().contains("<script"), "{input} -> {html}");
        assert!(!html.contains("alert(1)"), "{input} -> {html}");
    }
}

#[tokio::test]
async fn dangerous_attributes_are_dropped() {
    let html = processor()
        .process(r#"<img src="x.png" onerror="alert(1)"> [x](javascript:alert(1))"#)
        .await
        .unwrap();
    assert!(!html.contains("onerror"));
    assert!(!html.contains("javascript:"));
    assert!(html.contains(r#"src="x.png""#));
}

#[tokio::test]
async fn rendering_is_idempotent() {
    let processor = processor();
    let markdown = "# Title\n\n| a | b |\n|---|:-:|\n| 1 | 2 |\n\n- [x] done\n\n```rust\nfn main() {}\n```\n";
    let first = processor.process(markdown).await.unwrap();
    let second = processor.process(markdown).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(processor.loader().load_count(), 1);
}

#[tokio::test]
async fn blank_input_skips_the_pipeline() {
    let processor = processor();
    for input in ["", "   ", "\n\t\n"] {
        assert_eq!(processor.process(input).await.unwrap(), "");
    }
    assert_eq!(processor.runs(), 0);
    assert_eq!(processor.loader().load_count(), 0);
}

#[tokio::test]
async fn gfm_output_keeps_allowed_structure() {
    let html = processor()
        .process("- [ ] todo\n\n| left | right |\n|:-----|------:|\n| a | b |\n\n```js\nlet x\n```\n")
        .await
        .unwrap();
    assert!(html.contains(r#"type="checkbox""#));
    assert!(html.contains("disabled"));
    assert!(html.contains(r#"<th align="left">left</th>"#));
    assert!(html.contains(r#"<td align="right">b</td>"#));
    assert!(html.contains(r#"class="language-js""#));
    assert!(html.contains(r#"data-language="js""#));
}

#[tokio::test]
async fn footnote_links_reach_their_definitions() {
    let html = processor()
        .process("See the note.[^1]\n\n[^1]: The note.\n")
        .await
        .unwrap();
    assert!(html.contains(r##"href="#fn-1""##), "{html}");
    assert!(html.contains(r#"id="fn-1""#), "{html}");
}

#[tokio::test]
async fn failing_stage_shows_inline_error_and_recovers() {
    let processor = Processor::new(CrashingHighlighter);

    let html = processor.process("```crash\nboom\n```\n").await.unwrap();
    assert_eq!(html, RENDER_ERROR_HTML);

    let html = processor.process("# Fine").await.unwrap();
    assert_eq!(html.trim(), "<h1>Fine</h1>");
    assert_eq!(processor.runs(), 2);
    assert_eq!(processor.loader().load_count(), 1);
}

#[tokio::test]
async fn load_failures_surface_and_retry() {
    let fail = Arc::new(AtomicUsize::new(1));
    let processor = Processor::new(Switchable {
        fail: Arc::clone(&fail),
    });

    let err = processor.process("# Hi").await.unwrap_err();
    assert!(matches!(err, RenderError::PipelineLoadFailed(_)));
    assert_eq!(processor.runs(), 0);

    fail.store(0, Ordering::SeqCst);
    let html = processor.process("# Hi").await.unwrap();
    assert_eq!(html.trim(), "<h1>Hi</h1>");
    assert_eq!(processor.loader().load_count(), 2);
}

#[tokio::test]
async fn preview_settles_when_loading_fails() {
    let fail = Arc::new(AtomicUsize::new(1));
    let processor = Arc::new(Processor::new(Switchable {
        fail: Arc::clone(&fail),
    }));
    let preview = Preview::new(processor, Duration::from_millis(300));

    preview.render("# One").await;
    assert_eq!(preview.current(), RenderResult::default());

    fail.store(0, Ordering::SeqCst);
    preview.render("# Two").await;
    let state = preview.current();
    assert_eq!(state.html.trim(), "<h1>Two</h1>");
    assert!(!state.is_loading);
}

#[tokio::test]
async fn stale_renders_are_discarded() {
    let (release, gate) = oneshot::channel();
    let processor = Arc::new(Processor::new(Gated {
        gate: std::sync::Mutex::new(Some(gate)),
    }));
    let preview = Preview::new(processor, Duration::from_millis(300));

    let mut early = Box::pin(preview.render("# Early"));
    assert!(futures_util::poll!(early.as_mut()).is_pending());
    assert!(preview.current().is_loading);

    let mut late = Box::pin(preview.render("# Late"));
    assert!(futures_util::poll!(late.as_mut()).is_pending());

    release.send(()).unwrap();
    late.await;
    assert_eq!(preview.current().html.trim(), "<h1>Late</h1>");

    early.await;
    let state = preview.current();
    assert_eq!(state.html.trim(), "<h1>Late</h1>");
    assert!(!state.is_loading);
}

#[tokio::test(start_paused = true)]
async fn scheduled_renders_coalesce_to_the_last_input() {
    let processor = processor();
    let preview = Preview::new(Arc::clone(&processor), Duration::from_millis(300));

    for text in ["# H", "# He", "# Hel", "# Hello"] {
        preview.schedule(text);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(processor.runs(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert_eq!(processor.runs(), 1);
    assert_eq!(preview.current().html.trim(), "<h1>Hello</h1>");
}

#[tokio::test(start_paused = true)]
async fn cancelled_renders_never_run() {
    let processor = processor();
    let preview = Preview::new(Arc::clone(&processor), Duration::from_millis(300));

    preview.schedule("# Never");
    preview.cancel();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(processor.runs(), 0);
    assert_eq!(preview.current().html, "");
}

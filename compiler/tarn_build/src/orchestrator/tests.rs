use super::*;
use pretty_assertions::assert_eq;

fn queue(paths: &[&str]) -> VecDeque<String> {
    paths.iter().map(|p| (*p).to_string()).collect()
}

#[test]
fn enqueue_moves_existing_entries() {
    let mut q = queue(&["a", "b", "c"]);
    enqueue_back(&mut q, "a");
    assert_eq!(q, queue(&["b", "c", "a"]));
    enqueue_front(&mut q, "c");
    assert_eq!(q, queue(&["c", "b", "a"]));
    remove_path(&mut q, "b");
    assert_eq!(q, queue(&["c", "a"]));
}

#[test]
fn extension_is_lowercased_without_dot() {
    assert_eq!(extension_of("src/Main.TARN"), "tarn");
    assert_eq!(extension_of("notes.txt"), "txt");
    assert_eq!(extension_of("Makefile"), "");
}

#[test]
fn quiescence_tracks_queues_and_epoch() {
    let mut state: State<()> = State::new();
    assert!(state.unchanged_since(0));
    state.parse_queue.push_back("a".into());
    assert!(!state.is_quiescent());
    state.parse_queue.clear();
    state.epoch += 1;
    assert!(state.is_quiescent());
    assert!(!state.unchanged_since(0));
}

#[tokio::test]
async fn handle_reports_aborted_pass_when_sender_drops() {
    let (sender, receiver) = oneshot::channel();
    drop(sender);
    let result = CompileHandle { receiver }.await;
    assert_eq!(result, Err(BuildError::PassAborted));
}

#[tokio::test]
async fn handle_yields_sent_summary() {
    let (sender, receiver) = oneshot::channel();
    let summary = BuildSummary {
        errors: 2,
        generate_runs: 1,
        ..BuildSummary::default()
    };
    sender.send(Ok(summary)).unwrap();
    assert_eq!(CompileHandle { receiver }.await, Ok(summary));
}

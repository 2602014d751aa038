// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pane_reader::FakePaneReader;
use kasmos_adapters::FakeSessionAdapter;
use std::time::Duration;

fn harness(pane_id: &str) -> (EmbeddedTerminal<FakeSessionAdapter, FakePaneReader>, FakePaneReader) {
    let session = FakeSessionAdapter::new();
    session.add_session(pane_id, true);
    let reader = FakePaneReader::new();
    let terminal = EmbeddedTerminal::new(pane_id, 80, 24, session, reader.clone());
    (terminal, reader)
}

#[tokio::test]
async fn wait_for_render_returns_true_on_new_output() {
    let (mut terminal, reader) = harness("pane-1");
    reader.set_output("pane-1", b"hello\r\n".to_vec());

    let changed = terminal.wait_for_render(Duration::from_millis(500)).await.unwrap();
    assert!(changed);

    let (screen, render_changed) = terminal.render();
    assert!(render_changed);
    assert!(screen.contents().contains("hello"));
}

#[tokio::test]
async fn wait_for_render_times_out_without_new_output() {
    let (mut terminal, _reader) = harness("pane-1");
    let changed = terminal.wait_for_render(Duration::from_millis(80)).await.unwrap();
    assert!(!changed);
}

#[tokio::test]
async fn render_reports_unchanged_after_being_consumed() {
    let (mut terminal, reader) = harness("pane-1");
    reader.set_output("pane-1", b"hello\r\n".to_vec());
    terminal.wait_for_render(Duration::from_millis(500)).await.unwrap();

    let (_, first) = terminal.render();
    let (_, second) = terminal.render();
    assert!(first);
    assert!(!second);
}

#[tokio::test]
async fn closed_terminal_never_blocks_on_render() {
    let (mut terminal, _reader) = harness("pane-1");
    terminal.close();
    let changed = terminal.wait_for_render(Duration::from_secs(5)).await.unwrap();
    assert!(!changed);
}

#[tokio::test]
async fn resize_updates_parser_dimensions() {
    let (mut terminal, _reader) = harness("pane-1");
    terminal.resize(120, 40).await.unwrap();
    let (screen, _) = terminal.render();
    assert_eq!(screen.size(), (40, 120));
}

#[tokio::test]
async fn send_key_forwards_to_session() {
    let (terminal, _reader) = harness("pane-1");
    terminal.send_key(b"y").await.unwrap();
}

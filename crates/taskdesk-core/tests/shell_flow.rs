mod common;

use std::io::Cursor;
use std::sync::Arc;

use common::{Call, FakeApi, RecordingNotifier};
use taskdesk_core::config::Config;
use taskdesk_core::render::Renderer;
use taskdesk_core::session::Session;
use taskdesk_core::shell;

#[tokio::test]
async fn scripted_session_pages_creates_and_deletes() {
    let api = FakeApi::seeded(7);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session =
        Session::new(api.clone(), notifier.clone(), &Config::default()).expect("session");
    let renderer = Renderer::with_color(false);

    let script = "\
per-page 5
page 2
page 0
bogus
new title=\"Buy milk\" date=2024-01-01
delete 1
s
quit
";
    let mut out = Vec::new();
    shell::run(&mut session, &renderer, Cursor::new(script), &mut out)
        .await
        .expect("shell");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Página 2 de 2 · 7 tarefa(s) · 5 por página"));
    assert!(text.contains("erro: pages start at 1"));
    assert!(text.contains("erro: unknown command: bogus"));
    assert!(text.contains("Buy milk"));
    assert!(text.contains("Tem certeza que deseja excluir a tarefa \"Task 1\"? [s/N]"));

    assert!(api.stored(1).is_none());
    assert_eq!(api.stored(8).map(|t| t.title), Some("Buy milk".to_string()));
    assert!(api.calls().contains(&Call::Delete(1)));

    let messages: Vec<_> = notifier.notes().into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec!["Tarefa criada com sucesso!", "Tarefa excluída com sucesso!"]
    );
}

#[tokio::test]
async fn end_of_input_closes_the_shell() {
    let api = FakeApi::seeded(2);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut session =
        Session::new(api.clone(), notifier.clone(), &Config::default()).expect("session");
    let renderer = Renderer::with_color(false);

    let mut out = Vec::new();
    shell::run(
        &mut session,
        &renderer,
        Cursor::new("filter status=completed\napply\n"),
        &mut out,
    )
    .await
    .expect("shell");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("status=completed"));
    assert!(text.contains("Página 1 de 1 · 0 tarefa(s) · 10 por página"));
    assert_eq!(session.list.filter().status.as_ref().map(|s| s.as_str()), Some("completed"));
}

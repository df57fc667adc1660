//! End-to-end checks of the CLI subcommands against temp directories.

use std::path::PathBuf;

use quill_cli::audit::{run_audit, AuditArgs, AuditCommand};
use quill_cli::card::{run_card, CardArgs};
use quill_cli::ingest::{run_ingest, IngestArgs};

fn ingest_args(file: PathBuf, public_dir: PathBuf, audit_log: PathBuf) -> IngestArgs {
    IngestArgs {
        file,
        public_dir,
        mime: None,
        name: None,
        actor: "editor-bot".into(),
        audit_log: Some(audit_log),
    }
}

#[test]
fn ingest_then_verify_then_tamper() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    let log = dir.path().join("logs/audit.jsonl");

    for name in ["a.png", "b.webp", "c.jpeg"] {
        let src = dir.path().join(name);
        std::fs::write(&src, b"image").unwrap();
        assert_eq!(run_ingest(&ingest_args(src, public.clone(), log.clone())).unwrap(), 0);
    }

    let verify = AuditArgs {
        command: AuditCommand::Verify { file: log.clone() },
    };
    assert_eq!(run_audit(&verify).unwrap(), 0);

    let contents = std::fs::read_to_string(&log).unwrap();
    assert_eq!(contents.lines().count(), 3);
    assert!(contents.contains("\"actor\":\"editor-bot\""));

    let tampered = contents.replacen("editor-bot", "someone-else", 1);
    std::fs::write(&log, tampered).unwrap();
    assert_eq!(run_audit(&verify).unwrap(), 1);
}

#[test]
fn explicit_mime_overrides_guess() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("photo.png");
    std::fs::write(&src, b"image").unwrap();

    let mut args = ingest_args(src, dir.path().join("public"), dir.path().join("audit.jsonl"));
    args.mime = Some("image/gif".into());
    assert_eq!(run_ingest(&args).unwrap(), 1);
}

#[test]
fn card_command_prints_cards() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("posts.json");
    std::fs::write(&file, r#"[{"title":"Hello","coverImg":"https://cdn.example/x.png"}]"#).unwrap();

    let args = CardArgs {
        file,
        public_dir: dir.path().to_path_buf(),
        compact: true,
    };
    assert_eq!(run_card(&args).unwrap(), 0);
}

#[test]
fn verify_missing_log_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let verify = AuditArgs {
        command: AuditCommand::Verify {
            file: dir.path().join("absent.jsonl"),
        },
    };
    assert!(run_audit(&verify).is_err());
}

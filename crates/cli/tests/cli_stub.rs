use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn ragline(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ragline").expect("binary");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("RAGLINE_MODEL_MODE", "stub")
        .env("RAGLINE_OBJECT_ROOT", home.join("objects"))
        .env_remove("RAGLINE_API_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn ask_retrieves_the_matching_facts() {
    let temp = tempdir().unwrap();
    let body = stdout_json(ragline(temp.path()).args([
        "ask",
        "--question",
        "What are Don's favorite foods?",
        "--fact",
        "Don likes to eat pizza.",
        "--fact",
        "Don likes to eat pasta.",
        "--fact",
        "The weather is nice today.",
        "--json",
    ]));

    let context = body["context"].as_array().unwrap();
    assert_eq!(context.len(), 2);
    for hit in context {
        let text = hit["unit"]["content"]["data"].as_str().unwrap();
        assert!(text.starts_with("Don likes"), "{text}");
    }
    assert!(body["text"]
        .as_str()
        .unwrap()
        .ends_with("User: What are Don's favorite foods?"));
}

#[test]
fn ask_chunks_documents_from_files() {
    let temp = tempdir().unwrap();
    let book = temp.path().join("book.txt");
    fs::write(
        &book,
        "Scarlett O'Hara lives at Tara. \nThe war changes everything. \n",
    )
    .unwrap();

    let body = stdout_json(ragline(temp.path()).args([
        "ask",
        "--question",
        "Where does Scarlett live?",
        "--file",
        book.to_str().unwrap(),
        "--k",
        "1",
        "--json",
    ]));
    let context = body["context"].as_array().unwrap();
    assert_eq!(context.len(), 1);
    assert_eq!(
        context[0]["unit"]["content"]["data"],
        "Scarlett O'Hara lives at Tara. \n"
    );
    assert_eq!(
        context[0]["unit"]["metadata"]["source"],
        book.display().to_string()
    );
}

#[test]
fn similar_lists_every_fact_best_first() {
    let temp = tempdir().unwrap();
    ragline(temp.path())
        .args([
            "similar",
            "--query",
            "The first moon landing was in 1969.",
            "--fact",
            "The capital of France is Paris.",
            "--fact",
            "The first moon landing was in 1969.",
            "--fact",
            "Earth is the third planet from the sun.",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Similarity of The first moon landing was in 1969. with:\nThe first moon landing was in 1969.: 1.0\n",
        ))
        .stdout(predicate::str::contains("The capital of France is Paris.: "));
}

#[test]
fn similar_ranks_images_by_path() {
    let temp = tempdir().unwrap();
    let images = temp.path().join("images");
    fs::create_dir_all(&images).unwrap();
    for (name, bytes) in [("1.png", &b"first"[..]), ("2.png", b"second"), ("cat.png", b"first")] {
        fs::write(images.join(name), bytes).unwrap();
    }

    let body = stdout_json(ragline(temp.path()).args([
        "similar",
        "--image",
        "images/1.png",
        "--image",
        "images/2.png",
        "--query-image",
        "images/cat.png",
        "--json",
    ]));
    let lines = body.as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["input"], "images/1.png");
    assert!((lines[0]["similarity"].as_f64().unwrap() - 1.0).abs() < 1e-5);
}

#[test]
fn embed_prints_a_vector() {
    let temp = tempdir().unwrap();
    let body = stdout_json(ragline(temp.path()).args([
        "embed",
        "--text",
        "The first moon landing was in 1969.",
    ]));
    let values = body.as_array().unwrap();
    assert_eq!(values.len(), 256);
    assert!(values.iter().all(Value::is_number));
}

#[test]
fn generate_fills_a_bundled_template() {
    let temp = tempdir().unwrap();
    ragline(temp.path())
        .args([
            "generate",
            "--template",
            "summarize-points",
            "--var",
            "text=It was a dark night.",
            "--var",
            "points=2",
        ])
        .assert()
        .success()
        .stdout("Text: It was a dark night.\n From the text above, summarize the story in 2 points.\n");
}

#[test]
fn summarize_and_image_commands() {
    let temp = tempdir().unwrap();
    ragline(temp.path())
        .args(["summarize", "--text", "A long story.", "--points", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("summarize the story in 3 points."));

    let output = ragline(temp.path())
        .args(["image", "--description", "a red bicycle"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let url = String::from_utf8(output.stdout).unwrap();
    assert!(url.starts_with("file://"), "{url}");

    let stored = fs::read_dir(temp.path().join("objects").join("ragline-images"))
        .unwrap()
        .count();
    assert_eq!(stored, 1);
}

#[test]
fn chat_carries_history_between_lines() {
    let temp = tempdir().unwrap();
    ragline(temp.path())
        .args(["chat", "--raw"])
        .write_stdin("first\n\nsecond\n")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("first\nfirst first second\n"));

    ragline(temp.path())
        .args(["chat", "--stateless"])
        .write_stdin("cracks\nrust\n")
        .assert()
        .success()
        .stdout(predicate::str::ends_with(
            "following observation: cracks\nGenerate a quality assurance report based on the following observation: rust\n",
        ));
}

#[test]
fn invalid_configuration_fails_cleanly() {
    let temp = tempdir().unwrap();
    ragline(temp.path())
        .env("RAGLINE_MODEL_MODE", "local")
        .args(["embed", "--text", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RAGLINE_MODEL_MODE"));

    let config = temp.path().join("ragline.toml");
    fs::write(&config, "[retrieval]\nk = 0\n").unwrap();
    ragline(temp.path())
        .args(["--config", config.to_str().unwrap()])
        .args(["ask", "--question", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retrieval.k"));
}

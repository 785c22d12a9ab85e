use std::fs;

use pretty_assertions::assert_eq;
use studio_engine::{
    data_uri, decode_data_uri, ensure_output_dir, save_artifact, ArtifactStore, AtomicFileWriter,
    FailureKind,
};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("out").join("media");
    ensure_output_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("session.ron", "one").unwrap();
    let second = writer.write("session.ron", "two").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "two");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn writing_under_a_file_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(blocker.clone());
    assert!(writer.write_bytes("clip.mp4", b"data").is_err());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}

#[test]
fn dropping_an_artifact_releases_its_file() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("staging"));

    let artifact = store.materialize(b"frames", "video/mp4").unwrap();
    let path = artifact.path().to_path_buf();
    assert_eq!(path.extension().unwrap(), "mp4");
    assert_eq!(fs::read(&path).unwrap(), b"frames");
    assert_eq!(artifact.size(), 6);

    drop(artifact);
    assert!(!path.exists());
}

#[test]
fn explicit_release_deletes_the_file() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().to_path_buf());
    let artifact = store.materialize(b"x", "audio/wav").unwrap();
    let path = artifact.path().to_path_buf();

    artifact.release().unwrap();
    assert!(!path.exists());
}

#[test]
fn kept_artifact_survives_the_handle() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("staging"));
    let artifact = store.materialize(b"frames", "video/mp4").unwrap();
    let staged = artifact.path().to_path_buf();

    let dest = temp.path().join("videos").join("clip.mp4");
    let kept = artifact.keep(&dest).unwrap();

    assert_eq!(kept, dest);
    assert_eq!(fs::read(&dest).unwrap(), b"frames");
    assert!(!staged.exists());
}

#[test]
fn data_uri_artifacts_are_saved_under_hashed_names() {
    let temp = TempDir::new().unwrap();
    let uri = data_uri("image/png", b"\x89PNG");

    let first = save_artifact(temp.path(), Some("Scene 1: sunrise"), &uri).unwrap();
    let again = save_artifact(temp.path(), Some("Scene 1: sunrise"), &uri).unwrap();

    assert_eq!(first, again);
    let name = first.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Scene_1_sunrise--"), "{name}");
    assert!(name.ends_with(".png"));
    assert_eq!(fs::read(&first).unwrap(), b"\x89PNG");
}

#[test]
fn malformed_data_uri_is_reported() {
    let temp = TempDir::new().unwrap();
    let err = save_artifact(temp.path(), None, "https://not/a/data/uri").unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedResponse);

    let err = decode_data_uri("data:image/png;base64,***").unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedResponse);
}

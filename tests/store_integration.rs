use photo_kiosk::error::Error;
use photo_kiosk::store::PhotoStore;
use std::fs;
use tempfile::tempdir;

fn exts() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

#[test]
fn listing_matches_sorted_allowed_contents() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("b.png"), b"x").unwrap();
    fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
    fs::write(tmp.path().join("photo.PNG"), b"x").unwrap();
    fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
    fs::write(tmp.path().join("noext"), b"x").unwrap();
    // Storage is flat; nested files are not part of the photo set.
    fs::create_dir(tmp.path().join("nested")).unwrap();
    fs::write(tmp.path().join("nested").join("d.jpg"), b"x").unwrap();

    let store = PhotoStore::new(tmp.path(), &exts());
    assert_eq!(store.list(), vec!["a.jpg", "b.png", "photo.PNG"]);
}

#[test]
fn listing_missing_directory_is_empty() {
    let tmp = tempdir().unwrap();
    let store = PhotoStore::new(tmp.path().join("gone"), &exts());
    assert!(store.list().is_empty());
}

#[test]
fn save_and_remove_round_out_the_listing() {
    let tmp = tempdir().unwrap();
    let store = PhotoStore::new(tmp.path(), &exts());

    store.save("new.jpg", b"bytes").unwrap();
    assert_eq!(store.list(), vec!["new.jpg"]);
    assert_eq!(fs::read(tmp.path().join("new.jpg")).unwrap(), b"bytes");

    store.remove("new.jpg").unwrap();
    assert!(store.list().is_empty());
}

#[test]
fn removing_a_missing_photo_reports_not_found() {
    let tmp = tempdir().unwrap();
    let store = PhotoStore::new(tmp.path(), &exts());

    let err = store.remove("ghost.jpg").unwrap_err();
    assert!(matches!(err, Error::NotFound(name) if name == "ghost.jpg"));
}

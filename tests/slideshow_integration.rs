use photo_kiosk::events::KioskEvent;
use photo_kiosk::state::KioskState;
use photo_kiosk::store::PhotoStore;
use photo_kiosk::tasks::slideshow;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

fn exts() -> Vec<String> {
    vec!["jpg".to_string(), "png".to_string()]
}

async fn recv(rx: &mut Receiver<KioskEvent>) -> KioskEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for kiosk event")
        .expect("event channel closed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ticks_rotate_the_same_photo_to_every_client() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
    fs::write(tmp.path().join("b.png"), b"x").unwrap();

    let state = KioskState::new(PhotoStore::new(tmp.path(), &exts()));
    state.refresh().await;

    let (_id_a, mut rx_a) = state.subscribe().await;
    let (_id_b, mut rx_b) = state.subscribe().await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(slideshow::run(
        state.clone(),
        Duration::from_millis(50),
        cancel.clone(),
    ));

    // Each client starts from the connect-time push of the current photo.
    for rx in [&mut rx_a, &mut rx_b] {
        assert_eq!(recv(rx).await, KioskEvent::update_image("a.jpg"));
    }

    // Ticks then walk the set in order, wrapping, in lockstep for all clients.
    for expected in ["b.png", "a.jpg", "b.png"] {
        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(recv(rx).await, KioskEvent::update_image(expected));
        }
    }

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleting_the_displayed_photo_rewinds_to_the_survivor() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
    fs::write(tmp.path().join("b.png"), b"x").unwrap();

    let state = KioskState::new(PhotoStore::new(tmp.path(), &exts()));
    state.refresh().await;

    let (_id, mut rx) = state.subscribe().await;
    assert_eq!(recv(&mut rx).await, KioskEvent::update_image("a.jpg"));

    // Admin deletes the photo currently on screen; the refreshed set rewinds.
    state.store().remove("a.jpg").unwrap();
    state.refresh().await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(slideshow::run(
        state.clone(),
        Duration::from_millis(50),
        cancel.clone(),
    ));

    // Single survivor: every subsequent tick broadcasts it again.
    assert_eq!(recv(&mut rx).await, KioskEvent::update_image("b.png"));
    assert_eq!(recv(&mut rx).await, KioskEvent::update_image("b.png"));

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_photo_set_emits_nothing() {
    let tmp = tempdir().unwrap();

    let state = KioskState::new(PhotoStore::new(tmp.path(), &exts()));
    state.refresh().await;

    let (_id, mut rx) = state.subscribe().await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(slideshow::run(
        state.clone(),
        Duration::from_millis(30),
        cancel.clone(),
    ));

    // Several tick periods pass without a single event.
    let none = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(none.is_err(), "empty set must not produce events");

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_appears_at_the_next_tick_without_an_immediate_broadcast() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.jpg"), b"x").unwrap();

    let state = KioskState::new(PhotoStore::new(tmp.path(), &exts()));
    state.refresh().await;

    let (_id, mut rx) = state.subscribe().await;
    assert_eq!(recv(&mut rx).await, KioskEvent::update_image("a.jpg"));

    // Admin adds a photo; the refresh alone must not push anything.
    state.store().save("b.png", b"x").unwrap();
    state.refresh().await;
    let quiet = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(quiet.is_err(), "refresh must not broadcast");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(slideshow::run(
        state.clone(),
        Duration::from_millis(50),
        cancel.clone(),
    ));

    // The rewound cursor advances from a.jpg to b.png on the first tick.
    assert_eq!(recv(&mut rx).await, KioskEvent::update_image("b.png"));

    cancel.cancel();
    let _ = handle.await;
}

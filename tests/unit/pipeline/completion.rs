use super::*;
use std::sync::Arc;

const POLL: Duration = Duration::from_millis(5);

#[test]
fn first_post_wins() {
    let done = Completion::new();
    assert!(!done.is_posted());
    assert!(done.post(Ok(())));
    assert!(!done.post(Err(FlythroughError::sink("late"))));
    assert!(done.is_posted());
    assert!(done.take().unwrap().is_ok());
}

#[test]
fn result_is_handed_out_once() {
    let done = Completion::new();
    done.post(Err(FlythroughError::render("boom")));
    let err = done.wait(&InterruptFlag::new(), POLL, None).unwrap_err();
    assert!(matches!(err, FlythroughError::Render(_)));

    assert!(done.take().is_none());
    let again = done.wait(&InterruptFlag::new(), POLL, None).unwrap_err();
    assert!(matches!(again, FlythroughError::Pipeline(_)));
}

#[test]
fn wait_blocks_until_posted() {
    let done = Arc::new(Completion::new());
    let poster = {
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            done.post(Ok(()));
        })
    };
    done.wait(&InterruptFlag::new(), Duration::from_secs(5), None)
        .unwrap();
    poster.join().unwrap();
}

#[test]
fn interrupted_wait_leaves_the_slot_untouched() {
    let done = Completion::new();
    let flag = InterruptFlag::new();
    flag.raise();
    assert!(done.wait(&flag, POLL, None).unwrap_err().is_interrupted());

    done.post(Ok(()));
    assert!(done.take().unwrap().is_ok());
}

#[test]
fn take_before_post_is_none() {
    let done = Completion::new();
    assert!(done.take().is_none());
    assert!(done.post(Ok(())));
}

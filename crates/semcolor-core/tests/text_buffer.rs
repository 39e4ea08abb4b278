use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use semcolor_core::{Edit, EditError, Snapshot, TextBuffer};
use std::sync::{Arc, Mutex};
use std::thread;

fn open(lines: &[&str]) -> TextBuffer {
    let buffer = TextBuffer::new();
    let edits: Vec<Edit> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| Edit::insert_line(i, *line))
        .collect();
    buffer.replace(&edits).unwrap();
    buffer
}

fn summed_line_len(snapshot: &Snapshot) -> usize {
    (0..snapshot.line_count())
        .map(|line| snapshot.line_len(line).unwrap())
        .sum()
}

/// A batch that is valid against `snapshot`: in-bounds single-line edits plus an optional
/// appended line.
fn random_batch(rng: &mut StdRng, snapshot: &Snapshot) -> Vec<Edit> {
    const ALPHABET: &[char] = &['a', 'b', '1', '+', ' ', '你', '👋'];
    let mut edits = Vec::new();

    if snapshot.line_count() > 0 {
        let line = rng.gen_range(0..snapshot.line_count());
        let line_len = snapshot.line_len(line).unwrap();
        let column = rng.gen_range(0..=line_len);
        let delete_len = rng.gen_range(0..=line_len - column);
        let inserted: String = (0..rng.gen_range(0..4))
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
            .collect();
        edits.push(Edit::new(line, column, delete_len, inserted));
    }

    if rng.gen_bool(0.3) {
        edits.push(Edit::insert_line(snapshot.line_count(), "1+1 EQUALS 2"));
    }
    edits
}

#[test]
fn test_length_invariant_holds_for_random_batches() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let buffer = open(&["2+2 EQUALS 4", "", "x"]);

    for _ in 0..500 {
        let batch = random_batch(&mut rng, &buffer.snapshot());
        buffer.replace(&batch).unwrap();

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), summed_line_len(&snapshot));
        assert_eq!(
            snapshot.len(),
            snapshot.lines().map(|l| l.chars().count()).sum::<usize>()
        );
    }
}

#[test]
fn test_identical_batches_produce_identical_snapshots() {
    let mut rng = StdRng::seed_from_u64(42);
    let a = open(&["1+1 EQUALS 2", "abc"]);
    let b = open(&["1+1 EQUALS 2", "abc"]);

    for _ in 0..200 {
        let batch = random_batch(&mut rng, &a.snapshot());
        let changed_a = a.replace(&batch).unwrap();
        let changed_b = b.replace(&batch).unwrap();
        assert_eq!(changed_a, changed_b);
    }

    assert_eq!(*a.snapshot(), *b.snapshot());
    assert_eq!(a.text(), b.text());
}

#[test]
fn test_concurrent_writers_lose_no_edit() {
    const WRITERS: usize = 8;
    const EDITS_PER_WRITER: usize = 200;

    let lines: Vec<&str> = vec![""; WRITERS];
    let buffer = Arc::new(open(&lines));
    let start_version = buffer.version();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for _ in 0..EDITS_PER_WRITER {
                    let column = buffer.snapshot().line_len(writer).unwrap();
                    // Another writer only touches other lines, so the column stays valid
                    // across retries.
                    buffer.replace(&[Edit::new(writer, column, 0, "x")]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = buffer.snapshot();
    for line in 0..WRITERS {
        assert_eq!(snapshot.line_len(line), Some(EDITS_PER_WRITER));
    }
    assert_eq!(snapshot.len(), WRITERS * EDITS_PER_WRITER);
    assert_eq!(
        snapshot.version(),
        start_version + (WRITERS * EDITS_PER_WRITER) as u64
    );
}

#[test]
fn test_concurrent_writers_deliver_notifications_in_commit_order() {
    const WRITERS: usize = 8;
    const EDITS_PER_WRITER: usize = 500;

    let mut buffer = TextBuffer::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        buffer.subscribe(move |change| seen.lock().unwrap().push(change.snapshot.version()));
    }
    buffer
        .replace(&(0..WRITERS).map(|i| Edit::insert_line(i, "")).collect::<Vec<_>>())
        .unwrap();
    let buffer = Arc::new(buffer);

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for _ in 0..EDITS_PER_WRITER {
                    let column = buffer.snapshot().line_len(writer).unwrap();
                    buffer.replace(&[Edit::new(writer, column, 0, "x")]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1 + WRITERS * EDITS_PER_WRITER);
    let regressions = seen.windows(2).filter(|pair| pair[1] < pair[0]).count();
    assert_eq!(regressions, 0);
    assert_eq!(seen.last().copied(), Some(buffer.version()));
}

#[test]
fn test_overlapping_edits_follow_descending_column_order() {
    let buffer = open(&["abcdef"]);
    // Column 2 is applied first ("ab" + "Z" + "ef"), then column 1 deletes "bZ".
    buffer
        .replace(&[Edit::new(0, 1, 2, ""), Edit::new(0, 2, 2, "Z")])
        .unwrap();
    assert_eq!(buffer.text(), "aef");
}

#[test]
fn test_edit_on_line_appended_in_same_batch_is_rejected() {
    let buffer = open(&["a"]);
    let err = buffer
        .replace(&[Edit::insert_line(1, "b"), Edit::new(1, 1, 0, "c")])
        .unwrap_err();
    assert!(matches!(err, EditError::OutOfRange { line: 1, .. }));
    assert_eq!(buffer.line_count(), 1);
}

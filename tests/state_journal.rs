use rand::Rng;
use statejournal::{JournalReader, StateJournal};
use tempfile::tempdir;

#[test]
fn sequential_updates_are_readable_with_their_update_counter() {
    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();

    assert_eq!(journal.update(b"k1", b"v1").unwrap(), 1);
    assert_eq!(journal.update(b"k2", b"v2").unwrap(), 2);
    assert_eq!(journal.update(b"k1", b"v1b").unwrap(), 3);
    journal.commit().unwrap();

    assert_eq!(journal.get_raw(b"k1").unwrap(), (b"v1b".to_vec(), 3));
    assert_eq!(journal.get_raw(b"k2").unwrap(), (b"v2".to_vec(), 2));
    assert_eq!(journal.get_raw(b"missing").unwrap(), (Vec::new(), 0));
    assert_eq!(journal.get(b"k2").unwrap(), b"v2".to_vec());
    assert_eq!(journal.update_counter(), 3);
}

#[test]
fn delete_exposes_empty_value_and_zero_counter() {
    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();

    journal.update(b"k", b"v").unwrap();
    journal.delete(b"k").unwrap();
    journal.commit().unwrap();

    assert_eq!(journal.get_raw(b"k").unwrap(), (Vec::new(), 0));
    assert!(journal.get(b"k").unwrap().is_empty());
}

#[test]
fn update_with_empty_value_behaves_like_delete() {
    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();

    journal.update(b"k", b"v").unwrap();
    journal.update(b"k", b"").unwrap();
    journal.commit().unwrap();

    assert_eq!(journal.get_raw(b"k").unwrap(), (Vec::new(), 0));
}

#[test]
fn reopening_replays_committed_state_and_digest() {
    let dir = tempdir().unwrap();
    {
        let mut journal = StateJournal::open(dir.path()).unwrap();
        journal.update(b"a", b"1").unwrap();
        journal.update(b"b", b"2").unwrap();
        journal.update(b"a", b"3").unwrap();
        journal.commit().unwrap();
    }

    let journal = StateJournal::open(dir.path()).unwrap();
    assert_eq!(journal.update_counter(), 3);
    assert_eq!(journal.get_raw(b"a").unwrap(), (b"3".to_vec(), 3));
    assert_eq!(journal.get_raw(b"b").unwrap(), (b"2".to_vec(), 2));

    let reader = JournalReader::open(dir.path()).unwrap();
    assert_eq!(reader.validate_state(3).unwrap(), journal.state_digest());
}

#[test]
fn a_dropped_final_index_slot_is_recovered_by_truncating_both_files() {
    let dir = tempdir().unwrap();
    {
        let mut journal = StateJournal::open(dir.path()).unwrap();
        journal.update(b"a", b"1").unwrap();
        journal.update(b"a", b"2").unwrap();
        journal.commit().unwrap();
    }

    // Simulate a crash between the journal flush and the index flush for
    // the second entry: the journal bytes are intact, but its index slot
    // never made it to disk.
    let index_path = dir.path().join("state_journal.idx");
    let len = std::fs::metadata(&index_path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&index_path).unwrap();
    file.set_len(len - 4).unwrap();
    drop(file);

    let journal = StateJournal::open(dir.path()).unwrap();
    assert_eq!(journal.update_counter(), 1);

    let reader = JournalReader::open(dir.path()).unwrap();
    assert_eq!(reader.update_counter().unwrap(), 1);
    assert_eq!(reader.validate_state(1).unwrap(), journal.state_digest());
}

#[test]
fn rollback_restores_prior_values_and_truncates_history() {
    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();

    journal.update(b"k", b"v1").unwrap(); // 1
    journal.update(b"other", b"x").unwrap(); // 2
    journal.update(b"k", b"v2").unwrap(); // 3
    journal.delete(b"k").unwrap(); // 4
    journal.commit().unwrap();

    let digest_at_3 = {
        let reader = JournalReader::open(dir.path()).unwrap();
        reader.read_update(3).unwrap().state_digest
    };

    journal.rollback(3).unwrap();

    assert_eq!(journal.update_counter(), 3);
    assert_eq!(journal.state_digest(), digest_at_3);
    assert_eq!(journal.get_raw(b"k").unwrap(), (b"v2".to_vec(), 3));
    assert_eq!(journal.get_raw(b"other").unwrap(), (b"x".to_vec(), 2));

    // history beyond the rollback point is gone: a fresh reader only sees 3 entries
    let reader = JournalReader::open(dir.path()).unwrap();
    assert_eq!(reader.update_counter().unwrap(), 3);

    // further updates continue from the rolled-back counter
    assert_eq!(journal.update(b"k", b"v3").unwrap(), 4);
}

#[test]
fn rollback_to_zero_restores_the_empty_journal() {
    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();
    journal.update(b"k1", b"v1").unwrap();
    journal.update(b"k2", b"v2").unwrap();
    journal.commit().unwrap();

    journal.rollback(0).unwrap();

    assert_eq!(journal.update_counter(), 0);
    assert_eq!(journal.get_raw(b"k1").unwrap(), (Vec::new(), 0));
    assert_eq!(journal.get_raw(b"k2").unwrap(), (Vec::new(), 0));

    let empty = StateJournal::open(tempdir().unwrap().path()).unwrap().state_digest();
    assert_eq!(journal.state_digest(), empty);
}

#[test]
fn rollback_rejects_a_target_ahead_of_the_current_counter() {
    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();
    journal.update(b"k", b"v").unwrap();
    assert!(journal.rollback(5).is_err());
}

#[test]
fn get_ssv_proof_folds_to_the_current_state_digest() {
    use statejournal::evaluate_ssv;

    let dir = tempdir().unwrap();
    let mut journal = StateJournal::open(dir.path()).unwrap();
    for i in 0..10u32 {
        journal.update(format!("k{}", i).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
    }
    journal.commit().unwrap();

    let reader = JournalReader::open(dir.path()).unwrap();
    for target in 1..=10u64 {
        let proof = reader.get_ssv(target).unwrap();
        let folded = evaluate_ssv(Default::default(), &proof.hash_chain).unwrap();
        assert_eq!(folded, journal.state_digest());
    }
}

#[test]
fn a_thousand_interleaved_updates_replay_and_validate_after_reopen() {
    let dir = tempdir().unwrap();
    let mut rng = rand::thread_rng();
    let keys: Vec<String> = (0..20).map(|i| format!("key{}", i)).collect();

    {
        let mut journal = StateJournal::open(dir.path()).unwrap();
        for i in 0..1000u32 {
            let key = &keys[rng.gen_range(0, keys.len())];
            if i % 17 == 0 {
                journal.delete(key.as_bytes()).unwrap();
            } else {
                journal.update(key.as_bytes(), format!("v{}", i).as_bytes()).unwrap();
            }
            if i % 31 == 0 {
                journal.commit().unwrap();
            }
        }
        journal.commit().unwrap();
    }

    let journal = StateJournal::open(dir.path()).unwrap();
    assert_eq!(journal.update_counter(), 1000);

    let reader = JournalReader::open(dir.path()).unwrap();
    assert_eq!(reader.validate_state(1000).unwrap(), journal.state_digest());
}

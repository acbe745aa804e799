use statejournal::{evaluate_proof, Notary};
use tempfile::tempdir;

#[test]
fn opening_a_fresh_notary_starts_at_zero() {
    let dir = tempdir().unwrap();
    let notary = Notary::open(&dir.path().join("notary.log")).unwrap();
    assert_eq!(notary.counter(), 0);
}

#[test]
fn counter_tracks_the_number_of_appended_entries() {
    let dir = tempdir().unwrap();
    let mut notary = Notary::open(&dir.path().join("notary.log")).unwrap();
    for i in 0..5u32 {
        notary.append_data(format!("record-{}", i).as_bytes()).unwrap();
    }
    assert_eq!(notary.counter(), 5);
}

#[test]
fn reopening_preserves_the_counter_and_top_digest() {
    let path = tempdir().unwrap().path().join("notary.log");
    let digest = {
        let mut notary = Notary::open(&path).unwrap();
        for i in 0..7u32 {
            notary.append_data(format!("r{}", i).as_bytes()).unwrap();
        }
        notary.digest().unwrap()
    };

    let notary = Notary::open(&path).unwrap();
    assert_eq!(notary.counter(), 7);
    assert_eq!(notary.digest().unwrap(), digest);
}

#[test]
fn inclusion_proofs_fold_to_the_current_top_digest() {
    let dir = tempdir().unwrap();
    let mut notary = Notary::open(&dir.path().join("notary.log")).unwrap();
    for i in 0..40u32 {
        notary.append_data(format!("entry-{}", i).as_bytes()).unwrap();
    }
    let top = notary.digest().unwrap();

    for position in 1..=40u64 {
        let proof = notary.get_proof(position, false).unwrap();
        let folded = evaluate_proof(&proof).unwrap();
        assert_eq!(
            folded, top,
            "inclusion proof for position {} did not fold to the current top digest",
            position
        );
    }
}

#[test]
fn a_digest_proof_for_the_newest_entry_is_just_its_own_rolling_hash() {
    let dir = tempdir().unwrap();
    let mut notary = Notary::open(&dir.path().join("notary.log")).unwrap();
    notary.append_data(b"only entry").unwrap();

    let proof = notary.get_proof(1, true).unwrap();
    assert_eq!(evaluate_proof(&proof).unwrap(), notary.digest().unwrap());
}

#[test]
fn distinct_data_produces_distinct_proofs() {
    let dir = tempdir().unwrap();
    let mut notary = Notary::open(&dir.path().join("notary.log")).unwrap();
    notary.append_data(b"alpha").unwrap();
    notary.append_data(b"beta").unwrap();

    let first = notary.get_proof(1, false).unwrap();
    let second = notary.get_proof(2, false).unwrap();
    assert_ne!(first, second);
}

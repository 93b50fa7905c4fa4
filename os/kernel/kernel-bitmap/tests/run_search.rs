use kernel_bitmap::BitIndex;

const CAPACITY: usize = 1 << 12;

fn fresh() -> Vec<u32> {
    vec![0; BitIndex::words_for(CAPACITY)]
}

/// Every run length up to the word width is found at its exact start.
#[test]
fn exact_free_run_is_found_at_its_start() {
    for n in 1..=BitIndex::MAX_RUN {
        for k in [0, 1, 31, 32, 33, 100, CAPACITY - 64] {
            let mut words = fresh();
            let mut bits = BitIndex::new(&mut words, CAPACITY);
            bits.set_range(0..CAPACITY);
            bits.clear_range(k..k + n);
            assert_eq!(bits.find_first_clear_run(n), Some(k), "n={n} k={k}");
            if n < BitIndex::MAX_RUN {
                assert_eq!(bits.find_first_clear_run(n + 1), None, "n={n} k={k}");
            }
        }
    }
}

#[test]
fn lowest_run_wins() {
    let mut words = fresh();
    let mut bits = BitIndex::new(&mut words, CAPACITY);
    bits.set_range(0..CAPACITY);
    bits.clear_range(500..520);
    bits.clear_range(40..50);
    bits.clear_range(60..64);
    assert_eq!(bits.find_first_clear_run(4), Some(40));
    assert_eq!(bits.find_first_clear_run(11), Some(500));
}

#[test]
fn full_index_has_no_clear_slot() {
    let mut words = fresh();
    let mut bits = BitIndex::new(&mut words, CAPACITY);
    bits.set_range(0..CAPACITY);
    assert_eq!(bits.count_set(), CAPACITY);
    assert_eq!(bits.find_first_clear(), None);
    assert_eq!(bits.find_first_clear_run(1), None);
}

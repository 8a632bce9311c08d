use pginc::increment::DeltaBitmap;

#[test]
fn insert_and_contains() {
    let mut bm = DeltaBitmap::new();
    assert!(bm.is_empty());
    assert!(!bm.contains(10));

    bm.insert(10);
    bm.insert(64);
    bm.insert(10);

    assert!(bm.contains(10));
    assert!(bm.contains(64));
    assert!(!bm.contains(11));
    assert!(!bm.contains(100_000));
    assert_eq!(2, bm.len());
    assert!(!bm.is_empty());
}

#[test]
fn iterates_in_ascending_order() {
    let bm: DeltaBitmap = [300u32, 5, 63, 0, 64, 5].into_iter().collect();
    assert_eq!(vec![0, 5, 63, 64, 300], bm.iter().collect::<Vec<_>>());
    assert_eq!(5, bm.len());
}

#[test]
fn sparse_high_blocks_stay_small() {
    let bm: DeltaBitmap = [1u32, u32::MAX].into_iter().collect();

    assert!(bm.contains(u32::MAX));
    assert!(!bm.contains(u32::MAX - 1));
    assert_eq!(2, bm.len());
    assert_eq!(vec![1, u32::MAX], bm.iter().collect::<Vec<_>>());
    assert_eq!(vec![u32::MAX], bm.iter_from(3).collect::<Vec<_>>());
    assert_eq!(vec![u32::MAX], bm.iter_from(u32::MAX).collect::<Vec<_>>());
}

#[test]
fn iter_from_starts_inside_a_word() {
    let bm: DeltaBitmap = [2u32, 5, 63, 64, 130].into_iter().collect();
    assert_eq!(vec![5, 63, 64, 130], bm.iter_from(3).collect::<Vec<_>>());
    assert_eq!(vec![130], bm.iter_from(65).collect::<Vec<_>>());
    assert_eq!(0, bm.iter_from(131).count());
}

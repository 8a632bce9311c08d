use std::fs;
use std::io::Cursor;
use std::path::Path;

use pginc::increment::apply_file_increment;
use pginc::page::PageConfig;
use pginc::Error;
use tempfile::tempdir;

const BLCKSZ: usize = 8192;

fn filled_page(value: u8) -> Vec<u8> {
    vec![value; BLCKSZ]
}

fn container(file_size: u64, page_size: Option<u16>, pages: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = b"wi1\x55".to_vec();
    out.extend_from_slice(&file_size.to_le_bytes());
    if let Some(size) = page_size {
        out.extend_from_slice(&size.to_le_bytes());
    }
    out.extend_from_slice(&(pages.len() as u32).to_le_bytes());
    for (block, _) in pages {
        out.extend_from_slice(&block.to_le_bytes());
    }
    for (_, data) in pages {
        out.extend_from_slice(data);
    }
    out
}

fn config() -> PageConfig {
    PageConfig::new(BLCKSZ as u32).unwrap()
}

fn page_at(path: &Path, block: usize) -> Vec<u8> {
    let data = fs::read(path).unwrap();
    data[block * BLCKSZ..(block + 1) * BLCKSZ].to_vec()
}

fn three_page_target(path: &Path) {
    fs::write(
        path,
        [filled_page(1), filled_page(2), filled_page(3)].concat(),
    )
    .unwrap();
}

#[test]
fn patches_only_recorded_blocks() -> pginc::Result<()> {
    let dir = tempdir()?;
    let target = dir.path().join("16384");
    three_page_target(&target);

    let inc = container(
        3 * BLCKSZ as u64,
        None,
        &[(0, filled_page(0xa0)), (1, filled_page(0xa1))],
    );
    let summary = apply_file_increment(&target, Cursor::new(inc), false, false, &config())?;

    assert_eq!(2, summary.blocks_written);
    assert_eq!(3 * BLCKSZ as u64, fs::metadata(&target)?.len());
    assert_eq!(filled_page(0xa0), page_at(&target, 0));
    assert_eq!(filled_page(0xa1), page_at(&target, 1));
    assert_eq!(filled_page(3), page_at(&target, 2));
    Ok(())
}

#[test]
fn short_payload_leaves_target_resized_and_partially_patched() -> pginc::Result<()> {
    let dir = tempdir()?;
    let target = dir.path().join("16384");
    three_page_target(&target);

    let mut inc = container(
        2 * BLCKSZ as u64,
        None,
        &[(0, filled_page(0xa0)), (1, filled_page(0xa1))],
    );
    inc.truncate(inc.len() - BLCKSZ);

    let err = apply_file_increment(&target, Cursor::new(inc), false, false, &config())
        .expect_err("second page is missing");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::ShortRead { .. })
    ));

    assert_eq!(2 * BLCKSZ as u64, fs::metadata(&target)?.len());
    assert_eq!(filled_page(0xa0), page_at(&target, 0));
    assert_eq!(filled_page(2), page_at(&target, 1));
    Ok(())
}

#[test]
fn trailing_bytes_fail_after_patching() -> pginc::Result<()> {
    let dir = tempdir()?;
    let target = dir.path().join("16384");
    three_page_target(&target);

    let mut inc = container(3 * BLCKSZ as u64, None, &[(2, filled_page(0xa2))]);
    inc.push(0);

    let err = apply_file_increment(&target, Cursor::new(inc), false, false, &config())
        .expect_err("extra byte must be detected");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::UnexpectedTrailingData)
    ));
    assert_eq!(filled_page(0xa2), page_at(&target, 2));
    Ok(())
}

#[test]
fn missing_target_is_not_created_by_default() -> pginc::Result<()> {
    let dir = tempdir()?;
    let target = dir.path().join("16384");

    let inc = container(BLCKSZ as u64, None, &[(0, filled_page(9))]);
    let err = apply_file_increment(&target, Cursor::new(inc), false, true, &config())
        .expect_err("target must exist");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::TargetMissing(_))
    ));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn creates_missing_target_when_allowed() -> pginc::Result<()> {
    let dir = tempdir()?;
    let target = dir.path().join("16384");

    // Block 2 only; the leading pages become a hole.
    let inc = container(3 * BLCKSZ as u64, None, &[(2, filled_page(9))]);
    apply_file_increment(&target, Cursor::new(inc), true, true, &config())?;

    assert_eq!(3 * BLCKSZ as u64, fs::metadata(&target)?.len());
    assert_eq!(filled_page(0), page_at(&target, 0));
    assert_eq!(filled_page(9), page_at(&target, 2));
    Ok(())
}

#[test]
fn shrinks_target_to_recorded_size() -> pginc::Result<()> {
    let dir = tempdir()?;
    let target = dir.path().join("16384");
    three_page_target(&target);

    let inc = container(BLCKSZ as u64, None, &[]);
    apply_file_increment(&target, Cursor::new(inc), false, false, &config())?;

    assert_eq!(filled_page(1), fs::read(&target)?);
    Ok(())
}

#[test]
fn bad_header_never_touches_target() -> pginc::Result<()> {
    let dir = tempdir()?;
    let existing = dir.path().join("16384");
    three_page_target(&existing);
    let absent = dir.path().join("16385");

    let mut inc = container(0, None, &[]);
    inc[0] = b'x';
    let err = apply_file_increment(&existing, Cursor::new(inc.clone()), true, false, &config())
        .expect_err("invalid header");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidHeader)));
    assert_eq!(3 * BLCKSZ as u64, fs::metadata(&existing)?.len());

    inc[0] = b'w';
    inc[2] = b'9';
    let err = apply_file_increment(&absent, Cursor::new(inc), true, false, &config())
        .expect_err("unknown version");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::UnknownVersion { .. })
    ));
    assert!(!absent.exists());
    Ok(())
}

#[test]
fn truncated_block_list_fails_before_opening_target() -> pginc::Result<()> {
    let dir = tempdir()?;
    let absent = dir.path().join("16384");

    let mut inc = container(BLCKSZ as u64, None, &[]);
    // Claim a huge block count with no block numbers behind it.
    let count_at = inc.len() - 4;
    inc[count_at..].copy_from_slice(&u32::MAX.to_le_bytes());

    let err = apply_file_increment(&absent, Cursor::new(inc), true, false, &config())
        .expect_err("block list is missing");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::ShortRead { .. })
    ));
    assert!(!absent.exists());
    Ok(())
}

#[test]
fn variable_page_size_target_reads_page_size_field() -> pginc::Result<()> {
    let dir = tempdir()?;
    let oriole = dir.path().join("orioledb_data").join("5");
    fs::create_dir_all(&oriole)?;
    let target = oriole.join("16384");
    fs::write(&target, vec![1u8; 2 * 4096])?;

    let inc = container(2 * 4096, Some(4096), &[(1, vec![0xee; 4096])]);
    let summary = apply_file_increment(&target, Cursor::new(inc), false, false, &config())?;

    assert_eq!(4096, summary.page_size);
    let data = fs::read(&target)?;
    assert_eq!(vec![1u8; 4096], data[..4096]);
    assert_eq!(vec![0xeeu8; 4096], data[4096..]);
    Ok(())
}

#[test]
fn corrupt_page_size_field_fails_before_resizing_target() -> pginc::Result<()> {
    let dir = tempdir()?;
    let oriole = dir.path().join("orioledb_data").join("5");
    fs::create_dir_all(&oriole)?;
    let target = oriole.join("16384");
    fs::write(&target, vec![1u8; 2 * 4096])?;

    for bad in [0u16, 1000, 16] {
        let inc = container(0, Some(bad), &[(0, vec![0xee; bad as usize])]);
        let err = apply_file_increment(&target, Cursor::new(inc), false, false, &config())
            .expect_err("page size must be rejected");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidPageSize(size)) if *size == bad as u64
        ));
    }
    assert_eq!(vec![1u8; 2 * 4096], fs::read(&target)?);
    Ok(())
}

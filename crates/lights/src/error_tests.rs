// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{check_range, LightsError};

#[test]
fn range_check_accepts_bounds() -> anyhow::Result<()> {
    assert_eq!(check_range("r", 0, 255)?, 0);
    assert_eq!(check_range("r", 255, 255)?, 255);
    assert_eq!(check_range("brightness", 100, 100)?, 100);
    Ok(())
}

#[test]
fn range_check_rejects_outside() {
    assert_eq!(
        check_range("r", 256, 255),
        Err(LightsError::Range { what: "r", value: 256, min: 0, max: 255 })
    );
    assert_eq!(
        check_range("r", -1, 255),
        Err(LightsError::Range { what: "r", value: -1, min: 0, max: 255 })
    );
}

#[test]
fn http_status_mapping() {
    let range = LightsError::Range { what: "r", value: 300, min: 0, max: 255 };
    let index = LightsError::Index { what: "section", value: 3 };
    let transport = LightsError::Transport("broker gone".into());
    assert_eq!(range.http_status(), 400);
    assert_eq!(index.http_status(), 400);
    assert_eq!(transport.http_status(), 500);
}

#[test]
fn display_names_the_argument() {
    let e = LightsError::Range { what: "brightness", value: 101, min: 0, max: 100 };
    assert_eq!(e.to_string(), "brightness out of range: 101 not in 0..=100");
    let e = LightsError::Index { what: "section", value: 0 };
    assert_eq!(e.to_string(), "invalid section: 0");
}

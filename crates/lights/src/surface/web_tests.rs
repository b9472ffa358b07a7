// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{
    read_aggregate, validate, Aggregate, BarDto, BarSectionDto, RgbwDto, StripDto, VideoLightDto,
};
use crate::fixture::Fixtures;
use crate::test_support::FakePublisher;

fn sample() -> Aggregate {
    let section = || BarSectionDto {
        rgbw: vec![RgbwDto { r: 0, g: 0, b: 0, w: 0 }; 6],
        white: vec![0; 13],
    };
    Aggregate {
        led_strip: StripDto { r: 1, g: 2, b: 3 },
        led_bar: BarDto { section1: section(), section2: section() },
        video_light1: VideoLightDto { on: true, brightness: 50 },
        video_light2: VideoLightDto { on: false, brightness: 0 },
    }
}

fn rejection(aggregate: &Aggregate) -> anyhow::Result<String> {
    match validate(aggregate) {
        Err(message) => Ok(message),
        Ok(()) => anyhow::bail!("expected validation to fail"),
    }
}

#[test]
fn valid_aggregate_passes() {
    assert_eq!(validate(&sample()), Ok(()));
}

#[test]
fn strip_field_out_of_range_is_named() -> anyhow::Result<()> {
    let mut aggregate = sample();
    aggregate.led_strip.r = 300;
    let message = rejection(&aggregate)?;
    assert!(message.contains("ledStrip.r"), "{message}");
    Ok(())
}

#[test]
fn wrong_section_lengths_are_rejected() -> anyhow::Result<()> {
    let mut aggregate = sample();
    aggregate.led_bar.section1.rgbw.pop();
    assert!(rejection(&aggregate)?.contains("section1.rgbw"));

    let mut aggregate = sample();
    aggregate.led_bar.section2.white.push(0);
    assert!(rejection(&aggregate)?.contains("section2.white"));
    Ok(())
}

#[test]
fn brightness_out_of_range_is_rejected() -> anyhow::Result<()> {
    let mut aggregate = sample();
    aggregate.video_light2.brightness = 101;
    assert!(rejection(&aggregate)?.contains("videoLight2.brightness"));
    Ok(())
}

#[test]
fn aggregate_serialises_with_canonical_keys() -> anyhow::Result<()> {
    let value = serde_json::to_value(sample())?;
    assert!(value.get("ledStrip").is_some());
    assert!(value.get("ledBar").is_some());
    assert!(value["ledBar"].get("section1").is_some());
    assert!(value.get("videoLight1").is_some());
    assert!(value.get("videoLight2").is_some());
    Ok(())
}

#[tokio::test]
async fn read_aggregate_reflects_driver_state() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let fixtures = Fixtures::new(publisher, None);
    fixtures.strip.set_color(9, 8, 7).await?;
    fixtures.bar.set_rgbw(2, 1, 10, 11, 12, 13).await?;
    fixtures.bar.set_white(1, 4, 44).await?;
    fixtures.video[1].turn_on(66).await?;

    let aggregate = read_aggregate(&fixtures).await;
    assert_eq!((aggregate.led_strip.r, aggregate.led_strip.g, aggregate.led_strip.b), (9, 8, 7));
    let rgbw = &aggregate.led_bar.section2.rgbw[1];
    assert_eq!((rgbw.r, rgbw.g, rgbw.b, rgbw.w), (10, 11, 12, 13));
    assert_eq!(aggregate.led_bar.section1.white[4], 44);
    assert!(aggregate.video_light2.on);
    assert_eq!(aggregate.video_light2.brightness, 66);
    Ok(())
}

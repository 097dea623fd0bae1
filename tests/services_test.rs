mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fill_policy, test_profile, FakePage};
use srivari_autofill::error::{AppError, LocatorError};
use srivari_autofill::infrastructure::Key;
use srivari_autofill::models::{Locator, Selector};
use srivari_autofill::services::{
    wait_for_form, ElementResolver, FieldFiller, FillOutcome, FormPresence,
};

fn resolver_for(page: &Arc<FakePage>) -> ElementResolver {
    ElementResolver::new(page.clone(), test_profile().timings)
}

fn filler_for(page: &Arc<FakePage>) -> FieldFiller {
    FieldFiller::new(resolver_for(page), fill_policy(true))
}

fn by_id(id: &str) -> Locator {
    Locator::new(Selector::Id(id.to_string()))
}

#[tokio::test]
async fn test_primary_miss_resolves_through_id_fallback() {
    let page = Arc::new(FakePage::ttd_form());
    let resolver = resolver_for(&page);

    // 页面结构变了，主 XPath 失效，末级步骤里的 @id 仍然可用
    let locator = Locator::xpath(r#"//div[2]/form/input[@id="sevakName"]"#);
    let selector = resolver
        .locate(&locator, Duration::from_millis(20))
        .await
        .unwrap();

    assert_eq!(selector, Selector::Id("sevakName".to_string()));
    assert_eq!(resolver.find_now(&locator).await, Some(selector));
}

#[tokio::test]
async fn test_configured_alternate_is_tried_before_derived_ones() {
    let page = Arc::new(FakePage::ttd_form());
    let resolver = resolver_for(&page);

    let locator = Locator::xpath(r#"//div/input[@id="mobile"]"#)
        .with_alternate(Selector::Css("#mobileNo".to_string()));
    let selector = resolver
        .locate(&locator, Duration::from_millis(20))
        .await
        .unwrap();

    assert_eq!(selector, Selector::Css("#mobileNo".to_string()));
}

#[tokio::test]
async fn test_exhausted_chain_reports_locator_not_found() {
    let page = Arc::new(FakePage::ttd_form());
    let resolver = resolver_for(&page);

    let locator = Locator::xpath(r#"//div/input[@id="ghost"]"#);
    let err = resolver
        .locate(&locator, Duration::from_millis(20))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Locator(LocatorError::NotFound { ref locator, .. }) if locator.contains("ghost")
    ));
    assert!(!err.is_fatal());
    assert_eq!(resolver.find_now(&locator).await, None);
}

#[tokio::test]
async fn test_masked_date_typed_as_digits() {
    let page = Arc::new(FakePage::default());
    page.add_masked_date("dob");

    let outcome = filler_for(&page)
        .set_masked_date("出生日期", &by_id("dob"), "7/6/1995")
        .await;

    assert_eq!(outcome, FillOutcome::Written);
    assert_eq!(page.value("dob"), "07/06/1995");
    assert!(page.keys().contains(&Key::Char('0')));
    assert!(!page.keys().contains(&Key::Char('/')));
}

#[tokio::test]
async fn test_masked_date_without_mask_is_force_assigned() {
    // 页面掩码脚本没生效，键入结果是 "07061995"
    let page = Arc::new(FakePage::default());
    page.add_input("dob");

    let outcome = filler_for(&page)
        .set_masked_date("出生日期", &by_id("dob"), "1995-06-07")
        .await;

    assert_eq!(outcome, FillOutcome::Written);
    assert_eq!(page.value("dob"), "07/06/1995");
}

#[tokio::test]
async fn test_masked_date_mismatch_is_reported_not_raised() {
    let page = Arc::new(FakePage::default());
    page.add_frozen("dob");

    let outcome = filler_for(&page)
        .set_masked_date("出生日期", &by_id("dob"), "07-06-1995")
        .await;

    assert_eq!(outcome, FillOutcome::Mismatch);
    assert!(!outcome.is_filled());
    assert_eq!(page.value("dob"), "");
}

#[tokio::test]
async fn test_wait_for_form_detects_anchor_fields() {
    let page = Arc::new(FakePage::ttd_form());
    let profile = test_profile();

    let presence = wait_for_form(
        &resolver_for(&page),
        &profile.locators,
        Duration::from_millis(50),
    )
    .await;

    assert_eq!(presence, FormPresence::Detected);
}

#[tokio::test]
async fn test_wait_for_form_gives_up_without_anchors() {
    let page = Arc::new(FakePage::default());
    page.add_input("unrelated");
    let profile = test_profile();

    let presence = wait_for_form(
        &resolver_for(&page),
        &profile.locators,
        Duration::from_millis(30),
    )
    .await;

    assert_eq!(presence, FormPresence::AnchorsMissing);
}

#[tokio::test]
async fn test_wait_for_form_sees_form_after_partial_load() {
    let page = Arc::new(FakePage::ttd_form());
    // 只剩一个锚点字段也算检测到
    for id in ["idType", "idNumber", "sevakName", "mobileNo"] {
        page.remove(id);
    }
    let profile = test_profile();

    let presence = wait_for_form(
        &resolver_for(&page),
        &profile.locators,
        Duration::from_millis(50),
    )
    .await;

    assert_eq!(presence, FormPresence::Detected);
}

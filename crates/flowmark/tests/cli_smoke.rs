use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn workspace() -> tempfile::TempDir {
    let temp = tempfile::tempdir().unwrap();
    let cart = temp.path().join("packages/apps/cart");
    fs::create_dir_all(&cart).unwrap();
    fs::write(
        cart.join("multiColorBookmarks.json"),
        r#"{"packages/apps/cart/src/add.ts": {"4": ["open cart","AddItem",0,"openCart()"]}}"#,
    )
    .unwrap();
    fs::write(
        cart.join("joinedBookmarks.json"),
        r#"{"Checkout": [{"app":"cart","flow":"AddItem"},{"app":"pay","flow":"Pay"}]}"#,
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("packages/apps/pay")).unwrap();
    temp
}

fn flowmark(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flowmark").expect("binary exists");
    cmd.arg("--root").arg(root).env_remove("FLOWMARK_APPS_FOLDER");
    cmd
}

#[test]
fn help_displays_usage() {
    Command::cargo_bin("flowmark")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn tree_prints_filtered_forest() {
    let temp = workspace();
    flowmark(temp.path())
        .args(["tree", "--app", "cart", "--filter", "pay"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Joined Flows (FILTER: PAY)"))
        .stdout(predicate::str::contains("    Pay (pay)"))
        .stdout(predicate::str::contains("AddItem (cart)").not());
}

#[test]
fn tree_json_omits_empty_children() {
    let temp = workspace();
    let output = flowmark(temp.path())
        .args(["tree", "--app", "cart", "--filter", "checkout", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let forest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(forest[0]["type"], "category");
    assert!(forest[0].get("children").is_none());
    assert_eq!(forest[1]["children"][0]["label"], "Checkout");
}

#[test]
fn flow_prints_not_found_sentinel() {
    let temp = workspace();
    flowmark(temp.path())
        .args(["flow", "--app", "cart", "Missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- FLOW_NOT_FOUND ---"));
}

#[test]
fn lists_apps_and_manages_joined_file() {
    let temp = workspace();
    flowmark(temp.path())
        .args(["apps", "--without-bookmarks"])
        .assert()
        .success()
        .stdout("pay\n");

    flowmark(temp.path())
        .args(["manage-joined", "--app", "pay"])
        .assert()
        .success()
        .stdout(predicate::str::contains("joinedBookmarks.json"));
    let created = temp.path().join("packages/apps/pay/joinedBookmarks.json");
    assert_eq!(fs::read_to_string(created).unwrap(), "{}");
}

#[test]
fn snippet_prints_subflow_reference() {
    let temp = workspace();
    flowmark(temp.path())
        .args(["snippet", "--app", "cart", "AddItem"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""app":"cart""#))
        .stdout(predicate::str::contains(r#""flow":"AddItem""#));
}

#[test]
fn unknown_app_fails() {
    let temp = workspace();
    flowmark(temp.path())
        .args(["tree", "--app", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn search_reports_hits_across_apps() {
    let temp = workspace();
    flowmark(temp.path())
        .args(["search", "pay"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "joined cart/Checkout  packages/apps/cart/joinedBookmarks.json:1  cart/AddItem, pay/Pay",
        ));

    let output = flowmark(temp.path())
        .args(["search", "OPENCART", "nothing-here", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let hits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(hits.as_array().map(Vec::len), Some(1));
    assert_eq!(hits[0]["kind"], "basic");
    assert_eq!(hits[0]["flow"], "AddItem");
    assert_eq!(hits[0]["line_number"], "4");
}

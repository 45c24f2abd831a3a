use std::fs;
use std::path::Path;
use std::sync::Arc;

use flowmark::app::bookmarks::{AppLookup, parse_bookmarks};
use flowmark::app::catalog::{CatalogSources, FlowCatalog};
use flowmark::app::registry::AppRegistry;
use flowmark::app::tree::{Collapsible, FlowTreeProvider};
use flowmark::app::workspace::Workspace;
use flowmark::cli::render_tree;
use flowmark::domain::errors::{FlowError, Result};
use flowmark::domain::model::FlowKind;
use flowmark::infra::config::WorkspaceSettings;
use insta::assert_snapshot;

struct SingleApp;

impl AppLookup for SingleApp {
    fn code_for_path(&self, path: &str) -> Result<String> {
        match path {
            "a.ts" => Ok("APP1".into()),
            other => Err(FlowError::UnownedPath {
                path: other.to_owned(),
            }),
        }
    }

    fn file_name_for_code(&self, code: &str) -> Result<String> {
        match code {
            "APP1" => Ok("app-one".into()),
            other => Err(FlowError::UnknownAppCode {
                code: other.to_owned(),
            }),
        }
    }
}

fn write_app(root: &Path, app: &str, bookmarks: &str, joined: Option<&str>) {
    let dir = root.join("packages/apps").join(app);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("multiColorBookmarks.json"), bookmarks).unwrap();
    if let Some(joined) = joined {
        fs::write(dir.join("joinedBookmarks.json"), joined).unwrap();
    }
}

fn shop() -> tempfile::TempDir {
    let temp = tempfile::tempdir().unwrap();
    write_app(
        temp.path(),
        "cart",
        r#"{
            "packages/apps/cart/src/add.ts": {
                "4": ["open cart", "AddItem", 0, "openCart()"],
                "9": ["persist", "AddItem", 1, "save()"]
            },
            "packages/apps/cart/src/list.ts": {
                "2": ["render list", "ListItems", 0, "render()"]
            }
        }"#,
        Some(
            r#"{
                "Checkout": [{"app": "cart", "flow": "AddItem"}, {"app": "pay", "flow": "Pay"}],
                "Browse": [{"app": "cart", "flow": "ListItems"}]
            }"#,
        ),
    );
    write_app(
        temp.path(),
        "pay",
        r#"{"packages/apps/pay/src/pay.ts": {"20": ["charge card", "Pay", 0, "charge()"]}}"#,
        None,
    );
    temp
}

#[test]
fn steps_follow_recorded_index() {
    let raw = r#"{"a.ts": {"10": ["d1","Login",0,"t1"], "12": ["d2","Login",1,"t2"]}}"#;
    let flows = parse_bookmarks(raw, Path::new("a.json"), &SingleApp).unwrap();
    let login = &flows["Login"];
    let lines: Vec<_> = login.steps().iter().map(|s| s.line_number.as_str()).collect();
    assert_eq!(lines, ["10", "12"]);
    assert_eq!(login.steps()[0].code, "APP1");
    assert_eq!(login.steps()[1].file_name, "app-one");

    let reversed = r#"{"a.ts": {"5": ["late","Login",1,"t"], "9": ["early","Login",0,"t"]}}"#;
    let flows = parse_bookmarks(reversed, Path::new("a.json"), &SingleApp).unwrap();
    let descriptions: Vec<_> = flows["Login"]
        .steps()
        .iter()
        .map(|s| s.description.as_str())
        .collect();
    assert_eq!(descriptions, ["early", "late"]);
}

#[test]
fn unowned_path_fails_the_load() {
    let temp = tempfile::tempdir().unwrap();
    let bookmarks = temp.path().join("bookmarks.json");
    fs::write(&bookmarks, r#"{"elsewhere.ts": {"1": ["d","F",0,"t"]}}"#).unwrap();

    let catalog = FlowCatalog::new(
        "solo",
        CatalogSources {
            bookmarks_file: bookmarks,
            joined_file: temp.path().join("joined.json"),
        },
        Arc::new(SingleApp),
    );
    let err = catalog.load().unwrap_err();
    assert_eq!(err.to_string(), "Unable to Load Bookmarks for app solo");
    assert!(!catalog.is_loaded());
}

#[test]
fn renders_workspace_tree() {
    let temp = shop();
    let workspace = Workspace::discover(temp.path(), &WorkspaceSettings::default()).unwrap();
    let registry = AppRegistry::new(workspace);
    let mut provider = FlowTreeProvider::new(registry.load_app("cart").unwrap());

    assert_snapshot!(render_tree(provider.forest()), @r"
Basic Flows
  AddItem
  ListItems
Joined Flows
  Browse
    ListItems (cart)
  Checkout
    AddItem (cart)
    Pay (pay)
");

    provider.set_filter(Some("pay"));
    assert_snapshot!(render_tree(provider.forest()), @r"
Basic Flows (FILTER: PAY)
Joined Flows (FILTER: PAY)
  Checkout
    Pay (pay)
");

    let basic = &provider.forest()[0];
    assert_eq!(provider.collapsible_state(basic), Collapsible::None);
}

#[test]
fn joined_flow_resolves_across_apps() {
    let temp = shop();
    let workspace = Workspace::discover(temp.path(), &WorkspaceSettings::default()).unwrap();
    let registry = AppRegistry::new(workspace);

    let steps = registry
        .resolve_flow("cart", "Checkout", FlowKind::Joined)
        .unwrap();
    let summary: Vec<_> = steps
        .iter()
        .map(|s| format!("{}/{}:{}", s.app, s.flow, s.step.line_number))
        .collect();
    assert_eq!(summary, ["cart/AddItem:4", "cart/AddItem:9", "pay/Pay:20"]);
}

#[test]
fn reload_picks_up_edits() {
    let temp = shop();
    let workspace = Workspace::discover(temp.path(), &WorkspaceSettings::default()).unwrap();
    let registry = AppRegistry::new(workspace);
    let before = registry.load_app("pay").unwrap();
    assert_eq!(before.basic_flows().len(), 1);

    write_app(
        temp.path(),
        "pay",
        r#"{"packages/apps/pay/src/pay.ts": {"20": ["charge card", "Pay", 0, "c()"], "40": ["refund", "Refund", 0, "r()"]}}"#,
        None,
    );
    let after = registry.load_app("pay").unwrap();
    assert_eq!(after.basic_flows().len(), 2);
    assert_eq!(before.basic_flows().len(), 1);
}

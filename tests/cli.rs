use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("asset directory")).expect("create directory");
    fs::write(path, contents).expect("write asset");
}

fn build_assets() -> TempDir {
    let dir = tempfile::tempdir().expect("temp assets");
    let root = dir.path();
    write(
        root,
        "props/crate/prop.xml",
        r#"<prop mass="2"><cube/><material class="Crate"/></prop>"#,
    );
    write(
        root,
        "props/floor/prop.xml",
        r#"<prop><plane/></prop>"#,
    );
    write(
        root,
        "actors/player/actor.xml",
        r#"<actor mass="80"><cube/></actor>"#,
    );
    write(
        root,
        "scenes/demo.xml",
        r#"<scene>
  <gravity y="-9.8"/>
  <prop class="floor" fixed="yes"/>
  <prop id="box" class="crate" y="100">
    <translate x="25"/>
  </prop>
  <light id="lamp" y="300"/>
</scene>
"#,
    );
    dir
}

#[test]
fn cli_views_a_scene() {
    let assets = build_assets();
    let mut cmd = Command::cargo_bin("jyuzau").expect("binary exists");
    cmd.arg("demo")
        .arg("--assets")
        .arg(assets.path())
        .arg("--frames")
        .arg("30");
    cmd.assert()
        .success()
        .stdout(contains("Scene demo with 3 node(s) after 30 frame(s)"))
        .stdout(contains(" - floor at (0.0, 0.0, 0.0) [entity floor]"))
        .stdout(contains(" - box at (25.0,"))
        .stdout(contains("[light lamp]"));
}

#[test]
fn cli_walks_a_scene_with_the_stock_character() {
    let assets = build_assets();
    let mut cmd = Command::cargo_bin("jyuzau").expect("binary exists");
    cmd.arg("--walk")
        .arg("demo")
        .arg("--assets")
        .arg(assets.path());
    cmd.assert()
        .success()
        .stdout(contains("after 1 frame(s)"))
        .stdout(contains(" - actor::player[0] at (0.0, 0.0, 200.0)"))
        .stdout(contains("Player actor::player[0] (player)"));
}

#[test]
fn cli_reads_a_config_file() {
    let assets = build_assets();
    let config = assets.path().join("jyuzau.toml");
    fs::write(
        &config,
        format!("assets_root = {:?}\nframe_interval = 0.5\n", assets.path()),
    )
    .expect("write config");
    let mut cmd = Command::cargo_bin("jyuzau").expect("binary exists");
    cmd.arg("demo").arg("--config").arg(&config);
    cmd.assert().success().stdout(contains("Scene demo"));
}

#[test]
fn cli_reports_missing_scenes() {
    let assets = build_assets();
    let mut cmd = Command::cargo_bin("jyuzau").expect("binary exists");
    cmd.arg("nowhere").arg("--assets").arg(assets.path());
    cmd.assert()
        .failure()
        .stderr(contains("scene `nowhere` not found"));
}

#[test]
fn cli_requires_a_scene() {
    let mut cmd = Command::cargo_bin("jyuzau").expect("binary exists");
    cmd.assert().failure().stderr(contains("Usage: jyuzau <scene>"));
    let mut cmd = Command::cargo_bin("jyuzau").expect("binary exists");
    cmd.arg("demo").arg("--bogus");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"));
}

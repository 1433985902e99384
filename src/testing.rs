//! Asset trees on disk for tests.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use tempfile::TempDir;

use crate::loadable::AssetContext;
use crate::resources::ResourceGroups;

/// A small but complete set of assets, as `(relative path, contents)`.
pub static STOCK_ASSETS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        (
            "props/crate/prop.xml",
            r#"<prop mass="2"><cube/><material class="Crate/Wood"/></prop>"#,
        ),
        (
            "props/ball/prop.xml",
            r#"<prop mass="1"><sphere/><material src="ball.material" class="Ball"/></prop>"#,
        ),
        (
            "props/floor/prop.xml",
            r#"<prop><plane/><material class="Floor"/></prop>"#,
        ),
        (
            "props/rock/prop.xml",
            r#"<prop mass="5"><mesh src="rock.obj"/></prop>"#,
        ),
        (
            "props/rock/rock.obj",
            "v -10 0 -20\nv 10 0 -20\nv 10 30 20\nv -10 30 20\nf 1 2 3 4\n",
        ),
        (
            "actors/player/actor.xml",
            r#"<actor mass="80"><cube/><material class="Player"/></actor>"#,
        ),
        (
            "scenes/yard.xml",
            r#"<scene>
                <ambientlight r="0.2" g="0.3" b="0.4"/>
                <gravity y="-9.8"/>
                <prop class="floor" fixed="yes"/>
                <prop id="box1" class="crate" x="100" y="50">
                    <scale x="2" y="2" z="2"/>
                    <yaw deg="90"/>
                    <prop id="ball-on-box" class="ball" y="100"/>
                </prop>
                <light id="sun" y="500"/>
            </scene>"#,
        ),
    ]
});

/// A temporary assets root.
pub struct AssetTree {
    dir: TempDir,
    context: AssetContext,
}

impl AssetTree {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("temporary assets root");
        let context = AssetContext::new(dir.path(), ResourceGroups::new());
        Self { dir, context }
    }

    pub fn stock() -> Self {
        let tree = Self::empty();
        for (path, contents) in STOCK_ASSETS.iter() {
            tree.write(path, contents);
        }
        tree
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("asset directory");
        }
        fs::write(path, contents).expect("asset file");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn context(&self) -> &AssetContext {
        &self.context
    }
}

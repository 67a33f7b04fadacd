//! Basic livemd walkthrough: read items, write through them, watch views follow.
//!
//! Run with `RUST_LOG=livemd=debug` for the pipeline's log output.

use livemd::{Config, Microdata};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Team</title></head>
<body>
  <ul id="roster" data-itemtype="https://schema.org/Person">
    <template><li itemscope itemtype="https://schema.org/Person"><b itemprop="name"></b> (<i itemprop="skills[]"></i>)</li></template>
  </ul>
  <div id="alice" itemscope itemtype="https://schema.org/Person">
    <span itemprop="name">Alice</span>
    <span itemprop="skills">HTML</span><span itemprop="skills">CSS</span>
  </div>
  <div id="bob" itemscope itemtype="https://schema.org/Person">
    <span itemprop="name">Bob</span>
    <span itemprop="skills">Rust</span>
  </div>
</body>
</html>"#;

fn main() -> livemd::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut md = Microdata::from_html(PAGE, "https://example.com/team", Config::default())?;
    println!("livemd {}", livemd::VERSION);

    for item in md.items() {
        println!("{}", serde_json::to_string_pretty(&md.structured(item)).unwrap_or_default());
    }

    let alice = md.get("alice").expect("alice is on the page");
    md.set(alice, "skills", "Design")?;
    md.set(md.get("bob").expect("bob is on the page"), "name", "Robert")?;

    let events = md.flush();
    println!("external events after own writes: {}", events.len());

    let roster = md.document().get_element_by_id("roster").expect("roster is on the page");
    println!("{}", livemd::html::get_inner_html(md.tree(), roster));
    Ok(())
}

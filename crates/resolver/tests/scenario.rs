//! End-to-end resolution across a small node tree built from directories.

use std::sync::Arc;

use lineage_resolver::{
	CachingResolver, DirLocator, MapLocator, ParentRef, Policy, Resolve, ResolutionNode, ResolutionTracker, SymbolOrigin,
};

fn write_unit(root: &std::path::Path, rel: &str, bytes: &[u8]) {
	let path = root.join(rel);
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	std::fs::write(path, bytes).unwrap();
}

#[test]
fn parent_instance_is_reused_by_children_built_later() {
	let r1 = Arc::new(MapLocator::new("R1").with_unit("pkg.X", b"SymX"));
	let tracker = Arc::new(ResolutionTracker::new());
	let p: ParentRef = Arc::new(
		ResolutionNode::builder()
			.root(r1.clone())
			.instrumentation(tracker.clone())
			.build()
			.unwrap(),
	);
	let sym_x = p.resolve("pkg.X").unwrap();

	let c = ResolutionNode::builder()
		.parent(p.clone())
		.instrumentation(tracker.clone())
		.build()
		.unwrap();

	assert!(Arc::ptr_eq(&c.resolve("pkg.X").unwrap(), &sym_x));
	assert_eq!(r1.lookups("pkg.X"), 1);
	assert_eq!(tracker.recorded(p.id()), 1);
}

#[test]
fn plugin_tree_over_directories() {
	let temp = tempfile::tempdir().expect("create tempdir");
	let host_dir = temp.path().join("host");
	let plugin_dir = temp.path().join("plugin");
	write_unit(&host_dir, "api/Handle.unit", b"host-handle");
	write_unit(&host_dir, "lineage/Runtime.unit", b"host-runtime");
	write_unit(&plugin_dir, "api/Handle.unit", b"plugin-handle");
	write_unit(&plugin_dir, "plugin/Main.unit", b"plugin-main");
	write_unit(&plugin_dir, "lineage/Runtime.unit", b"plugin-runtime");

	let tracker = Arc::new(ResolutionTracker::new());
	let host: ParentRef = Arc::new(
		ResolutionNode::builder()
			.root(Arc::new(DirLocator::new(&host_dir).unwrap()))
			.reserved(lineage_resolver::ReservedNamespace::none())
			.instrumentation(tracker.clone())
			.build()
			.unwrap(),
	);
	let plugin = ResolutionNode::builder()
		.root(Arc::new(DirLocator::new(&plugin_dir).unwrap()))
		.policy(Policy::from_prefixes(["api."], Vec::<String>::new()))
		.parent(host.clone())
		.instrumentation(tracker.clone())
		.build()
		.unwrap();

	// Shared API comes from the host, the plugin's own code from the plugin,
	// and the reserved namespace never resolves from plugin roots.
	assert_eq!(plugin.resolve("api.Handle").unwrap().bytes(), b"host-handle");
	assert_eq!(plugin.resolve("plugin.Main").unwrap().bytes(), b"plugin-main");
	assert_eq!(plugin.resolve("lineage.Runtime").unwrap().bytes(), b"host-runtime");
	assert_eq!(
		plugin.resolve("plugin.Main").unwrap().origin(),
		&SymbolOrigin::File(plugin_dir.join("plugin/Main.unit"))
	);

	// A flat cache in front of the plugin reuses the plugin's instances.
	let plugin: ParentRef = Arc::new(plugin);
	let front = CachingResolver::seeded(plugin.clone(), tracker.as_ref());
	assert!(Arc::ptr_eq(&front.resolve("api.Handle").unwrap(), &plugin.resolve("api.Handle").unwrap()));
	assert!(front.resolve("plugin.Missing").unwrap_err().is_not_found());
}

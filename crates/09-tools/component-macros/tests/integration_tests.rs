//! 派生宏集成测试

use component_macros::Injectable;
use di_abstractions::{object_ref, Disposable, Injector, Instance, Provider, SupplierRef};
use di_impl::{InjectorImpl, MapObjectSupplier};
use std::sync::Arc;

fn map_supplier() -> (Arc<MapObjectSupplier>, SupplierRef) {
    let map = MapObjectSupplier::new();
    let supplier: SupplierRef = map.clone();
    (map, supplier)
}

#[derive(Default, Injectable)]
#[injectable(creatable, default)]
struct Helper {
    #[inject(optional)]
    label: Option<String>,
}

#[derive(Default, Injectable)]
#[injectable(default, post_construct = "init")]
struct Service {
    #[inject]
    helper: Option<Instance<Helper>>,
    #[inject(named = "endpoint")]
    endpoint: Option<String>,
    #[inject(optional)]
    retries: u32,
    #[inject(optional)]
    lazy: Option<Provider<Helper>>,
    started: usize,
}

impl Service {
    fn init(&mut self) {
        self.started += 1;
    }
}

#[derive(Default, Injectable)]
#[injectable(default)]
struct Base {
    #[inject(named = "base")]
    base_name: Option<String>,
}

#[derive(Default, Injectable)]
#[injectable(default, extends = "base")]
struct Child {
    base: Base,
    #[inject(named = "child")]
    child_name: Option<String>,
}

#[derive(Default, Injectable)]
#[injectable(default, disposable, pre_destroy = "close")]
struct Session {
    #[inject(named = "session")]
    token: Option<String>,
    closed: usize,
    disposed: usize,
}

impl Session {
    fn close(&mut self) {
        self.closed += 1;
    }
}

impl Disposable for Session {
    fn dispose(&mut self) {
        self.disposed += 1;
    }
}

#[derive(Injectable)]
#[injectable(singleton)]
struct Unconstructible;

#[test]
fn test_derived_fields_are_injected() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set_named("endpoint", "http://localhost".to_string());
    map.set(7_u32);

    let service = injector.make::<Service>(Some(&supplier), None).unwrap();
    let service = service.read();
    assert_eq!(service.endpoint.as_deref(), Some("http://localhost"));
    assert_eq!(service.retries, 7);
    assert!(service.helper.is_some());
    assert_eq!(service.started, 1);

    let lazy = service.lazy.as_ref().unwrap().get().unwrap();
    assert!(lazy.read().label.is_none());
}

#[test]
fn test_missing_required_field_fails() {
    let injector = InjectorImpl::new();
    let (_map, supplier) = map_supplier();
    assert!(injector.make::<Service>(Some(&supplier), None).is_err());
}

#[test]
fn test_tracked_field_follows_supplier() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set_named("endpoint", "first".to_string());

    let service = injector.make::<Service>(Some(&supplier), None).unwrap();
    map.set_named("endpoint", "second".to_string());

    let service = service.read();
    assert_eq!(service.endpoint.as_deref(), Some("second"));
    assert_eq!(service.started, 1);
}

#[test]
fn test_parent_field_is_injected() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set_named("base", "parent".to_string());
    map.set_named("child", "derived".to_string());

    let child = injector.make::<Child>(Some(&supplier), None).unwrap();
    let child = child.read();
    assert_eq!(child.base.base_name.as_deref(), Some("parent"));
    assert_eq!(child.child_name.as_deref(), Some("derived"));
}

#[test]
fn test_uninject_clears_option_fields() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set_named("session", "abc".to_string());

    let session = injector.make::<Session>(Some(&supplier), None).unwrap();
    assert!(map.uninject(&object_ref(&session)).unwrap());

    let session = session.read();
    assert!(session.token.is_none());
    assert_eq!(session.closed, 1);
    assert_eq!(session.disposed, 0);
}

#[test]
fn test_dispose_runs_lifecycle_once() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set_named("session", "abc".to_string());

    let session = injector.make::<Session>(Some(&supplier), None).unwrap();
    map.dispose();
    map.dispose();

    let session = session.read();
    assert_eq!(session.closed, 1);
    assert_eq!(session.disposed, 1);
}

#[test]
fn test_class_without_constructor_cannot_be_made() {
    let injector = InjectorImpl::new();
    assert!(injector.make::<Unconstructible>(None, None).is_err());
}

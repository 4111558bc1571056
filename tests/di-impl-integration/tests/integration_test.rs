//! 注入器端到端集成测试

use component_macros::Injectable;
use di_abstractions::{
    object_ref, ClassBuilder, Injectable, Injector, Instance, ObjectDescriptor, Param, SupplierRef,
};
use di_impl::{InjectorImpl, MapObjectSupplier};
use infrastructure_common::InjectorConfig;
use infrastructure_composition::InjectorBuilder;
use std::any::Any;
use std::sync::Arc;

trait Bar: Send + Sync {
    fn greet(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Default)]
struct BarImpl;

impl Bar for BarImpl {
    fn greet(&self) -> String {
        "bar".to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Injectable for BarImpl {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.singleton();
        class.default_constructor();
    }
}

struct Foo {
    bar: Instance<dyn Bar>,
    text: String,
    initialized: usize,
}

impl Injectable for Foo {
    fn describe(class: &mut ClassBuilder<Self>) {
        class
            .constructor(|args| {
                Ok(Foo {
                    bar: args.require::<Instance<dyn Bar>>(0)?,
                    text: args.require::<String>(1)?,
                    initialized: 0,
                })
            })
            .inject()
            .arg(Param::of::<Instance<dyn Bar>>())
            .arg(Param::of::<String>().named("x"));
        class
            .method("init", |this, _| {
                this.initialized += 1;
                Ok(None)
            })
            .post_construct();
    }
}

/// 通过派生宏声明的消费者
#[derive(Default, Injectable)]
#[injectable(default)]
struct Consumer {
    #[inject]
    bar: Option<Instance<dyn Bar>>,
    #[inject(named = "x")]
    text: Option<String>,
}

fn bind_bar(injector: &InjectorImpl) {
    let _ = injector
        .add_binding::<Instance<dyn Bar>>()
        .implemented_as::<BarImpl, Instance<dyn Bar>, _>(|bar| bar as Instance<dyn Bar>);
}

fn hello_supplier() -> (Arc<MapObjectSupplier>, SupplierRef) {
    let map = MapObjectSupplier::new();
    map.set_named("x", "hello".to_string());
    let supplier: SupplierRef = map.clone();
    (map, supplier)
}

fn is_bar_impl(bar: &Instance<dyn Bar>) -> bool {
    bar.read().as_any().is::<BarImpl>()
}

#[test]
fn test_constructor_injection_through_binding() {
    let injector = InjectorImpl::new();
    bind_bar(&injector);
    let (_map, supplier) = hello_supplier();

    let foo = injector.make::<Foo>(Some(&supplier), None).unwrap();
    let foo = foo.read();

    assert!(is_bar_impl(&foo.bar));
    assert_eq!(foo.bar.read().greet(), "bar");
    assert_eq!(foo.text, "hello");
    assert_eq!(foo.initialized, 1);
}

#[test]
fn test_bound_singleton_is_shared() {
    let injector = InjectorImpl::new();
    bind_bar(&injector);
    let (_map, supplier) = hello_supplier();

    let first = injector.make::<Foo>(Some(&supplier), None).unwrap();
    let second = injector.make::<Foo>(Some(&supplier), None).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    let first_bar = Arc::as_ptr(&first.read().bar) as *const ();
    let second_bar = Arc::as_ptr(&second.read().bar) as *const ();
    assert_eq!(first_bar, second_bar);
}

#[test]
fn test_missing_binding_leaves_foo_unconstructible() {
    let injector = InjectorImpl::new();
    let (_map, supplier) = hello_supplier();
    assert!(injector.make::<Foo>(Some(&supplier), None).is_err());
}

#[test]
fn test_bindings_are_immutable_values() {
    let injector = InjectorImpl::new();
    let base = injector.add_binding::<Instance<dyn Bar>>();
    let named = base.named("special");
    let implemented = named.implemented_as::<BarImpl, Instance<dyn Bar>, _>(|bar| bar as Instance<dyn Bar>);

    assert!(base.qualifier_name().is_none());
    assert!(base.implementation_class().is_none());
    assert_eq!(named.qualifier_name(), Some("special"));
    assert!(named.implementation_class().is_none());
    assert_eq!(implemented.qualifier_name(), Some("special"));
    assert!(implemented.implementation_class().is_some());

    let found = injector
        .find_binding(&ObjectDescriptor::of::<Instance<dyn Bar>>().named("special"))
        .unwrap();
    assert!(found.implementation_class().is_some());
}

#[test]
fn test_builder_wires_bindings_and_derived_fields() {
    let (map, supplier) = hello_supplier();
    let injector = InjectorBuilder::new()
        .with_config(InjectorConfig::default())
        .with_default_supplier(supplier.clone())
        .bind(bind_bar)
        .build()
        .unwrap();

    let consumer = injector.make::<Consumer>(Some(&supplier), None).unwrap();
    {
        let consumer = consumer.read();
        assert!(consumer.bar.as_ref().is_some_and(is_bar_impl));
        assert_eq!(consumer.text.as_deref(), Some("hello"));
    }

    map.set_named("x", "updated".to_string());
    assert_eq!(consumer.read().text.as_deref(), Some("updated"));

    assert!(map.uninject(&object_ref(&consumer)).unwrap());
    let consumer = consumer.read();
    assert!(consumer.bar.is_none());
    assert!(consumer.text.is_none());
}

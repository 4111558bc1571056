//! 注入器行为测试

use di_abstractions::{
    instance, object_ref, value, Arg, ClassBuilder, Disposable, ExtendedObjectSupplier, InjectionError,
    Injectable, Injector, Instance, ObjectDescriptor, Param, PrimaryObjectSupplier, Provider,
    Qualifier, Requestor, SupplierRef,
};
use di_impl::{register_extended_supplier, InjectorImpl, MapObjectSupplier};
use infrastructure_common::InjectorConfig;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn map_supplier() -> (Arc<MapObjectSupplier>, SupplierRef) {
    let map = MapObjectSupplier::new();
    let supplier: SupplierRef = map.clone();
    (map, supplier)
}

// ---- 测试类型 ----

struct Choice {
    picked: usize,
}

impl Injectable for Choice {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.constructor(|_| Ok(Choice { picked: 0 }));
        class
            .constructor(|_| Ok(Choice { picked: 1 }))
            .arg(Param::of::<String>());
        class
            .constructor(|_| Ok(Choice { picked: 2 }))
            .inject()
            .arg(Param::of::<String>())
            .arg(Param::of::<u32>());
    }
}

#[derive(Default)]
struct Registry;

impl Injectable for Registry {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.singleton();
        class.default_constructor();
    }
}

#[derive(Default)]
struct Base {
    name: Option<String>,
    calls: Vec<String>,
}

impl Injectable for Base {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .field::<String, _>("name", |this, name| this.name = name)
            .inject()
            .optional();
        class
            .method("setup", |this, _| {
                this.calls.push("base setup".to_string());
                Ok(None)
            })
            .inject();
        class
            .method("ready", |this, _| {
                this.calls.push("base ready".to_string());
                Ok(None)
            })
            .post_construct();
    }
}

#[derive(Default)]
struct Child {
    base: Base,
}

impl Injectable for Child {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.extends(|this: &mut Self| &mut this.base);
        class.default_constructor();
        class
            .method("setup", |this, _| {
                let seen = this.base.name.clone().unwrap_or_default();
                this.base.calls.push(format!("child setup {seen}"));
                Ok(None)
            })
            .inject();
        class
            .method("ready", |this, _| {
                this.base.calls.push("child ready".to_string());
                Ok(None)
            })
            .post_construct();
    }
}

struct Settings {
    retries: i32,
    label: Option<String>,
}

impl Injectable for Settings {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.constructor(|_| {
            Ok(Settings {
                retries: 5,
                label: Some("initial".to_string()),
            })
        });
        class
            .field::<i32, _>("retries", |this, retries| this.retries = retries.unwrap_or(-1))
            .inject()
            .optional();
        class
            .field::<String, _>("label", |this, label| this.label = label)
            .inject()
            .optional();
    }
}

#[derive(Default)]
struct Strict {
    label: Option<String>,
}

impl Injectable for Strict {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .field::<String, _>("label", |this, label| this.label = label)
            .inject();
    }
}

static EXPENSIVE_BUILT: AtomicUsize = AtomicUsize::new(0);

struct Expensive;

impl Injectable for Expensive {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.constructor(|_| {
            EXPENSIVE_BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Expensive)
        });
    }
}

#[derive(Default)]
struct Deferred {
    factory: Option<Provider<Expensive>>,
}

impl Injectable for Deferred {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .provider_field::<Expensive, _>("factory", |this, factory| this.factory = factory)
            .inject();
    }
}

#[derive(Default)]
struct Resource {
    text: Option<String>,
    destroyed: usize,
    disposed: usize,
}

impl Disposable for Resource {
    fn dispose(&mut self) {
        self.disposed += 1;
    }
}

impl Injectable for Resource {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class.disposable();
        class
            .field::<String, _>("text", |this, text| this.text = text)
            .inject();
        class
            .method("close", |this, _| {
                this.destroyed += 1;
                Ok(None)
            })
            .pre_destroy();
    }
}

#[derive(Default)]
struct Note {
    text: Option<String>,
    closed: usize,
}

impl Injectable for Note {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .field::<String, _>("text", |this, text| this.text = text)
            .inject();
        class
            .method("close", |this, _| {
                this.closed += 1;
                Ok(None)
            })
            .pre_destroy();
    }
}

#[derive(Default)]
struct Helper;

impl Injectable for Helper {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.creatable();
        class.default_constructor();
    }
}

#[derive(Default)]
struct Plain;

impl Injectable for Plain {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
    }
}

#[derive(Default)]
struct UsesHelper {
    helper: Option<Instance<Helper>>,
}

impl Injectable for UsesHelper {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .object_field::<Helper, _>("helper", |this, helper| this.helper = helper)
            .inject();
    }
}

#[derive(Default)]
struct UsesPlain {
    plain: Option<Instance<Plain>>,
}

impl Injectable for UsesPlain {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .object_field::<Plain, _>("plain", |this, plain| this.plain = plain)
            .inject();
    }
}

#[derive(Default)]
struct Command {
    runs: usize,
}

impl Injectable for Command {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .method("run", |this, args| {
                this.runs += 1;
                let target = args.require::<String>(0)?;
                Ok(Some(value(format!("{target}:{}", this.runs))))
            })
            .marker("execute")
            .arg(Param::of::<String>());
    }
}

/// 可隐式构造，但唯一的构造函数需要提供者给出 `u64`
struct Unbuildable;

impl Injectable for Unbuildable {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.creatable();
        class
            .constructor(|_| Ok(Unbuildable))
            .inject()
            .arg(Param::of::<u64>());
    }
}

struct Fallback {
    picked: usize,
}

impl Injectable for Fallback {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.constructor(|_| Ok(Fallback { picked: 0 }));
        class
            .constructor(|_| Ok(Fallback { picked: 1 }))
            .inject()
            .arg(Param::object::<Unbuildable>());
    }
}

#[derive(Default)]
struct Dispatcher {
    runs: usize,
}

impl Injectable for Dispatcher {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .method("go", |this, _| {
                this.runs += 1;
                Ok(None)
            })
            .marker("go")
            .arg(Param::object::<Unbuildable>());
    }
}

/// 构造函数带一个前置的合成参数
struct Nested {
    outer: u8,
    name: String,
}

impl Injectable for Nested {
    fn describe(class: &mut ClassBuilder<Self>) {
        class
            .constructor(|args| {
                Ok(Nested {
                    outer: args.require::<u8>(0)?,
                    name: args.require::<String>(1)?,
                })
            })
            .inject()
            .arg(Param::of::<String>())
            .synthetic::<u8>();
    }
}

struct Broken;

impl Injectable for Broken {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.constructor(|_| Err(anyhow::anyhow!("disk unavailable")));
    }
}

static BANNER: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

struct Banner;

impl Injectable for Banner {
    fn describe(class: &mut ClassBuilder<Self>) {
        class
            .static_field::<String, _>("banner", |banner| *BANNER.lock() = banner)
            .inject();
    }
}

#[derive(Default)]
struct Themed {
    colour: Option<String>,
    missing: Option<String>,
}

impl Injectable for Themed {
    fn describe(class: &mut ClassBuilder<Self>) {
        class.default_constructor();
        class
            .field::<String, _>("colour", |this, colour| this.colour = colour)
            .inject()
            .qualifier(Qualifier::new("preference", Some("colour".to_string())));
        class
            .field::<String, _>("missing", |this, missing| this.missing = missing)
            .inject()
            .optional()
            .qualifier(Qualifier::new("preference", Some("absent".to_string())));
    }
}

struct Preferences;

impl ExtendedObjectSupplier for Preferences {
    fn get(
        &self,
        descriptor: &ObjectDescriptor,
        _requestor: Option<&Arc<dyn Requestor>>,
        _track: bool,
        _group_updates: bool,
    ) -> Arg {
        match descriptor
            .qualifier("preference")
            .and_then(|q| q.value.as_deref())
        {
            Some("colour") => Arg::Value(value("blue".to_string())),
            _ => Arg::NotAValue,
        }
    }
}

/// 记录请求者的提供者，供 `update` 测试使用
#[derive(Default)]
struct Recording {
    text: Mutex<Option<String>>,
    seen: Mutex<Vec<Arc<dyn Requestor>>>,
}

impl PrimaryObjectSupplier for Recording {
    fn get(
        &self,
        descriptors: &[Option<ObjectDescriptor>],
        values: &mut [Arg],
        requestor: Option<&Arc<dyn Requestor>>,
        _initial: bool,
        track: bool,
        _group_updates: bool,
    ) {
        for (descriptor, slot) in descriptors.iter().zip(values.iter_mut()) {
            let Some(descriptor) = descriptor else {
                continue;
            };
            if descriptor.desired_type().id == TypeId::of::<String>() {
                if let Some(text) = self.text.lock().clone() {
                    *slot = Arg::Value(value(text));
                }
            }
            if let (true, Some(requestor)) = (track, requestor) {
                self.seen.lock().push(requestor.clone());
            }
        }
    }
}

// ---- 构造 ----

#[test]
fn test_constructor_selection_falls_back_to_default() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("text".to_string());

    let fallback = injector.make::<Choice>(Some(&supplier), None).unwrap();
    assert_eq!(fallback.read().picked, 0, "非注入构造函数不参与选择");

    map.set(7_u32);
    let chosen = injector.make::<Choice>(Some(&supplier), None).unwrap();
    assert_eq!(chosen.read().picked, 2);
}

#[test]
fn test_failed_implicit_construction_falls_back_to_next_constructor() {
    let injector = InjectorImpl::new();
    let fallback = injector.make::<Fallback>(None, None).unwrap();
    assert_eq!(fallback.read().picked, 0);

    let (map, supplier) = map_supplier();
    map.set(3_u64);
    let chosen = injector.make::<Fallback>(Some(&supplier), None).unwrap();
    assert_eq!(chosen.read().picked, 1);
}

#[test]
fn test_synthetic_params_arrive_in_raw_order() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set(9_u8);
    map.set("inner".to_string());

    let nested = injector.make::<Nested>(Some(&supplier), None).unwrap();
    let nested = nested.read();
    assert_eq!(nested.outer, 9);
    assert_eq!(nested.name, "inner");
}

#[test]
fn test_singletons_are_cached_per_injector() {
    let injector = InjectorImpl::new();
    let first = injector.make::<Registry>(None, None).unwrap();
    let second = injector.make::<Registry>(None, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other = InjectorImpl::new().make::<Registry>(None, None).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}

#[test]
fn test_constructor_errors_keep_cause() {
    let injector = InjectorImpl::new();
    let error = injector.make::<Broken>(None, None).err().unwrap();
    assert!(matches!(error, InjectionError::Invocation { .. }));
    assert!(error.to_string().contains("Broken"));
}

// ---- 层级 ----

#[test]
fn test_overridden_methods_are_injected_once() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("widget".to_string());

    let child = injector.make::<Child>(Some(&supplier), None).unwrap();
    assert_eq!(
        child.read().base.calls,
        vec!["child setup widget".to_string(), "child ready".to_string()]
    );

    let base = injector.make::<Base>(Some(&supplier), None).unwrap();
    assert_eq!(
        base.read().calls,
        vec!["base setup".to_string(), "base ready".to_string()]
    );
}

#[test]
fn test_each_injector_applies_its_own_depth_limit() {
    let shallow = InjectorImpl::with_config(InjectorConfig {
        debug: false,
        max_hierarchy_depth: 1,
    });
    let deep = InjectorImpl::new();

    let error = shallow.make::<Child>(None, None).err().unwrap();
    assert!(matches!(error, InjectionError::IncompatibleClass { .. }));
    assert!(deep.make::<Child>(None, None).is_ok());
    let error = shallow.make::<Child>(None, None).err().unwrap();
    assert!(matches!(error, InjectionError::IncompatibleClass { .. }));
}

// ---- 可选与缺省值 ----

#[test]
fn test_optional_fields_receive_defaults() {
    let injector = InjectorImpl::new();
    let settings = injector.make::<Settings>(None, None).unwrap();
    let settings = settings.read();
    assert_eq!(settings.retries, 0);
    assert!(settings.label.is_none());
}

#[test]
fn test_missing_required_value_fails() {
    let injector = InjectorImpl::new();
    let error = injector.make::<Strict>(None, None).err().unwrap();
    assert!(error.is_unsatisfied());

    let debug = InjectorImpl::with_config(InjectorConfig::debug());
    assert!(debug.config().debug);
    assert!(debug.make::<Strict>(None, None).err().unwrap().is_unsatisfied());
}

#[test]
fn test_creatable_types_are_constructed_implicitly() {
    let injector = InjectorImpl::new();
    let uses = injector.make::<UsesHelper>(None, None).unwrap();
    assert!(uses.read().helper.is_some());

    let error = injector.make::<UsesPlain>(None, None).err().unwrap();
    assert!(error.is_unsatisfied());
}

// ---- 提供者 ----

#[test]
fn test_providers_construct_lazily() {
    let injector = InjectorImpl::new();
    let deferred = injector.make::<Deferred>(None, None).unwrap();
    assert_eq!(EXPENSIVE_BUILT.load(Ordering::SeqCst), 0);

    let factory = deferred.read().factory.clone().unwrap();
    let first = factory.get().unwrap();
    let second = factory.get().unwrap();
    assert_eq!(EXPENSIVE_BUILT.load(Ordering::SeqCst), 2);
    assert!(!Arc::ptr_eq(&first, &second));
}

// ---- 跟踪与更新 ----

#[test]
fn test_tracked_fields_follow_supplier_changes() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("first".to_string());

    let note = injector.make::<Note>(Some(&supplier), None).unwrap();
    assert_eq!(note.read().text.as_deref(), Some("first"));
    assert_eq!(map.tracked_count(), 1);

    map.set("second".to_string());
    assert_eq!(note.read().text.as_deref(), Some("second"));
    assert_eq!(map.tracked_count(), 1, "重新注入不会重复记录请求者");
}

#[test]
fn test_temp_supplier_is_not_retained() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("primary".to_string());
    let (temp_map, temp) = map_supplier();
    temp_map.set("temporary".to_string());

    let note = instance(Note::default());
    injector
        .inject_with(&object_ref(&note), Some(&supplier), Some(&temp))
        .unwrap();
    assert_eq!(note.read().text.as_deref(), Some("temporary"));

    map.set("changed".to_string());
    assert_eq!(note.read().text.as_deref(), Some("changed"));
}

#[test]
fn test_update_reresolves_with_nulls() {
    let injector = InjectorImpl::new();
    let recording = Arc::new(Recording::default());
    *recording.text.lock() = Some("first".to_string());
    let supplier: SupplierRef = recording.clone();

    let note = injector.make::<Note>(Some(&supplier), None).unwrap();
    assert_eq!(note.read().text.as_deref(), Some("first"));

    let requestors = recording.seen.lock().clone();
    assert!(!requestors.is_empty());

    *recording.text.lock() = None;
    assert!(injector.update(&requestors, Some(&supplier)).unwrap());
    assert!(note.read().text.is_none());
}

#[test]
fn test_static_members_are_injected() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("welcome".to_string());

    injector.inject_static::<Banner>(Some(&supplier)).unwrap();
    assert_eq!(BANNER.lock().as_deref(), Some("welcome"));
}

#[test]
fn test_extended_supplier_claims_qualified_slots() {
    register_extended_supplier("preference", Arc::new(Preferences));
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("from map".to_string());

    let themed = injector.make::<Themed>(Some(&supplier), None).unwrap();
    let themed = themed.read();
    assert_eq!(themed.colour.as_deref(), Some("blue"));
    assert!(themed.missing.is_none(), "已认领的槽位不再向主提供者查询");
}

// ---- 调用 ----

#[test]
fn test_invoke_finds_resolvable_marker() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("deploy".to_string());

    let command = injector.make::<Command>(None, None).unwrap();
    let handle = object_ref(&command);
    let result = injector
        .invoke(&handle, "execute", Some(&supplier), None)
        .unwrap()
        .unwrap();
    assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("deploy:1"));

    let error = injector.invoke(&handle, "execute", None, None).err().unwrap();
    assert!(matches!(error, InjectionError::NoMatchingMethod { .. }));

    let fallback = injector
        .invoke_or(&handle, "missing", Some(value(42_i32)), Some(&supplier), None)
        .unwrap()
        .unwrap();
    assert_eq!(fallback.downcast_ref::<i32>(), Some(&42));
    assert_eq!(command.read().runs, 1);
}

#[test]
fn test_invoke_returns_default_when_implicit_construction_fails() {
    let injector = InjectorImpl::new();
    let dispatcher = injector.make::<Dispatcher>(None, None).unwrap();
    let handle = object_ref(&dispatcher);

    let result = injector
        .invoke_or(&handle, "go", Some(value(7_i32)), None, None)
        .unwrap()
        .unwrap();
    assert_eq!(result.downcast_ref::<i32>(), Some(&7));
    assert_eq!(dispatcher.read().runs, 0);
}

// ---- 拆除与释放 ----

#[test]
fn test_uninject_resets_fields_and_stops_tracking() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("hello".to_string());

    let note = injector.make::<Note>(Some(&supplier), None).unwrap();
    assert!(injector.is_injected(&object_ref(&note), &supplier));

    assert!(map.uninject(&object_ref(&note)).unwrap());
    assert!(note.read().text.is_none());
    assert_eq!(note.read().closed, 1);

    map.set("again".to_string());
    assert!(note.read().text.is_none());
    assert!(!injector.uninject(&note, &supplier).unwrap());
}

#[test]
fn test_disposal_runs_callbacks_once() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("payload".to_string());

    let resource = injector.make::<Resource>(Some(&supplier), None).unwrap();
    injector.disposed(&supplier).unwrap();
    injector.disposed(&supplier).unwrap();

    let resource = resource.read();
    assert_eq!(resource.destroyed, 1);
    assert_eq!(resource.disposed, 1);
}

#[test]
fn test_supplier_dispose_notifies_requestors() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();
    map.set("payload".to_string());

    let resource = injector.make::<Resource>(Some(&supplier), None).unwrap();
    map.dispose();
    map.dispose();

    assert_eq!(resource.read().destroyed, 1);
    assert_eq!(resource.read().disposed, 1);
    assert!(!injector.is_injected(&object_ref(&resource), &supplier));
}

#[test]
fn test_objects_without_injection_points_are_still_disposed() {
    let injector = InjectorImpl::new();
    let (map, supplier) = map_supplier();

    let registry = injector.make::<Registry>(Some(&supplier), None).unwrap();
    assert!(injector.is_injected(&object_ref(&registry), &supplier));
    assert_eq!(map.tracked_count(), 1);

    map.dispose();
    assert!(!injector.is_injected(&object_ref(&registry), &supplier));
}

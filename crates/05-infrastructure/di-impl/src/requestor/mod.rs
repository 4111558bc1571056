//! 注入请求者实现

mod site;

pub use site::ObjectMarker;
pub(crate) use site::{Outcome, Site};

use crate::injector::InjectorImpl;
use crate::resolver::Pass;
use di_abstractions::{
    object_id, supplier_id, Args, Arg, ObjectDescriptor, ObjectRef, RequestKey, Requestor,
    SupplierRef, WeakObject, WeakSupplier,
};
use infrastructure_common::{InjectionError, InjectionResult, Location, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// 请求者标志
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Flags {
    pub(crate) track: bool,
    pub(crate) group_updates: bool,
    pub(crate) optional: bool,
}

/// 第一个未解析的参数位置
pub(crate) fn first_unresolved(args: &[Arg]) -> Option<usize> {
    args.iter().position(|arg| !arg.is_resolved())
}

pub struct InjectionRequestor {
    self_ref: Weak<InjectionRequestor>,
    site: Site,
    location: Location,
    injector: Arc<InjectorImpl>,
    object: Mutex<Option<WeakObject>>,
    object_id: Option<usize>,
    supplier: Option<WeakSupplier>,
    supplier_id: Option<usize>,
    temp: Mutex<Option<SupplierRef>>,
    flags: Flags,
    resolved: Mutex<Option<Vec<Option<Value>>>>,
}

impl InjectionRequestor {
    pub(crate) fn new(
        injector: Arc<InjectorImpl>,
        site: Site,
        object: Option<&ObjectRef>,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
        flags: Flags,
    ) -> Arc<Self> {
        let object = object.filter(|_| site.needs_object());
        let reference = object.map(|object| match supplier {
            Some(supplier) => supplier.make_reference(object),
            None => Arc::downgrade(object),
        });
        let location = site.location();
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            site,
            location,
            injector,
            object: Mutex::new(reference),
            object_id: object.map(object_id),
            supplier: supplier.map(Arc::downgrade),
            supplier_id: supplier.map(supplier_id),
            temp: Mutex::new(temp.cloned()),
            flags,
            resolved: Mutex::new(None),
        })
    }

    pub(crate) fn dependent_objects(&self) -> Arc<[ObjectDescriptor]> {
        self.site.dependent_objects(self.injector.cache())
    }

    pub(crate) fn primary_supplier(&self) -> Option<SupplierRef> {
        self.supplier.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_resolved(&self, args: Option<Vec<Arg>>) {
        *self.resolved.lock() = args.map(|args| args.into_iter().map(Arg::into_option).collect());
    }

    pub(crate) fn clear_temp_supplier(&self) {
        *self.temp.lock() = None;
    }

    pub(crate) fn this(&self) -> InjectionResult<Arc<Self>> {
        self.self_ref
            .upgrade()
            .ok_or_else(|| InjectionError::incompatible(self.location.to_string(), "请求者已释放"))
    }

    /// 使用已解析的参数执行注入点，执行后清除参数。未解析时什么也不做
    pub(crate) fn execute_outcome(&self) -> InjectionResult<Outcome> {
        let Some(args) = self.resolved.lock().take() else {
            return Ok(Outcome::Done);
        };
        let object = self.requesting_object();
        if self.object_id.is_some() && object.is_none() {
            debug!("请求对象已被回收，跳过 {}", self.location);
            return Ok(Outcome::Done);
        }
        let supplier = self.primary_supplier();
        self.site
            .execute(object.as_ref(), Args::new(args), supplier.as_ref())
    }
}

impl Requestor for InjectionRequestor {
    fn location(&self) -> Location {
        self.location
    }

    fn key(&self) -> RequestKey {
        RequestKey {
            location: self.location,
            group_updates: self.flags.group_updates,
            injector: self.injector.id(),
            optional: self.flags.optional,
            supplier: self.supplier_id,
            object: self.object_id,
        }
    }

    fn requesting_object(&self) -> Option<ObjectRef> {
        self.object.lock().as_ref().and_then(Weak::upgrade)
    }

    fn is_valid(&self) -> bool {
        match self.object_id {
            Some(_) => self.requesting_object().is_some(),
            None => true,
        }
    }

    fn is_optional(&self) -> bool {
        self.flags.optional
    }

    fn should_track(&self) -> bool {
        self.flags.track
    }

    fn should_group_updates(&self) -> bool {
        self.flags.group_updates
    }

    fn resolve_arguments(&self, initial: bool) -> InjectionResult<()> {
        let this = self.this()?;
        let supplier = self.primary_supplier();
        let temp = self.temp.lock().clone();
        let args = self.injector.resolve_args(
            &this,
            supplier.as_ref(),
            temp.as_ref(),
            Pass::refresh(initial, self.flags.track),
        )?;
        match first_unresolved(&args) {
            None => {
                self.set_resolved(Some(args));
                Ok(())
            }
            Some(index) => {
                self.set_resolved(None);
                if self.flags.optional {
                    return Ok(());
                }
                Err(InjectionError::Unsatisfied {
                    requestor: self.location.to_string(),
                    dependency: self.dependent_objects()[index].to_string(),
                })
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn execute(&self) -> InjectionResult<Option<Value>> {
        self.execute_outcome().map(Outcome::into_value)
    }

    fn disposed(&self, supplier: &SupplierRef) -> InjectionResult<()> {
        self.injector.dispose_supplier(supplier)?;
        *self.object.lock() = None;
        Ok(())
    }

    fn uninject(&self, object: &ObjectRef, supplier: &SupplierRef) -> InjectionResult<bool> {
        self.injector.uninject_object(object, supplier)
    }
}

impl PartialEq for InjectionRequestor {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for InjectionRequestor {}

impl std::hash::Hash for InjectionRequestor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for InjectionRequestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionRequestor")
            .field("site", &self.site)
            .field("track", &self.flags.track)
            .field("optional", &self.flags.optional)
            .finish()
    }
}

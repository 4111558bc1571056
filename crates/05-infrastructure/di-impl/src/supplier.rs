//! 基于映射表的主对象提供者
//!
//! 按 `(类型, 名称)` 保存值，记录读取过值的请求者，值变化时重新解析并执行它们。

use di_abstractions::{
    object_id, Arg, ObjectDescriptor, ObjectRef, PrimaryObjectSupplier, RequestKey, Requestor,
    SupplierRef,
};
use infrastructure_common::{payload_type, value, InjectionResult, Value};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

type Slot = (TypeId, Option<String>);

fn slot_of(descriptor: &ObjectDescriptor) -> Slot {
    (
        descriptor.desired_type().id,
        descriptor.name().map(str::to_string),
    )
}

/// 映射表提供者
pub struct MapObjectSupplier {
    self_ref: Weak<MapObjectSupplier>,
    values: RwLock<HashMap<Slot, Value>>,
    tracked: Mutex<HashMap<Slot, Vec<Arc<dyn Requestor>>>>,
    paused: AtomicUsize,
}

impl MapObjectSupplier {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            values: RwLock::new(HashMap::new()),
            tracked: Mutex::new(HashMap::new()),
            paused: AtomicUsize::new(0),
        })
    }

    /// 设置 `S` 类型的值并通知记录的请求者
    pub fn set<S: Send + Sync + 'static>(&self, item: S) {
        self.put((TypeId::of::<S>(), None), value(item));
    }

    /// 设置带名称的值
    pub fn set_named<S: Send + Sync + 'static>(&self, name: impl Into<String>, item: S) {
        self.put((TypeId::of::<S>(), Some(name.into())), value(item));
    }

    /// 直接设置已擦除类型的值，值的负载类型决定槽位
    pub fn set_value(&self, name: Option<&str>, item: Value) {
        self.put((payload_type(&item), name.map(str::to_string)), item);
    }

    pub fn remove<S: Send + Sync + 'static>(&self) -> bool {
        self.take_slot((TypeId::of::<S>(), None))
    }

    pub fn remove_named<S: Send + Sync + 'static>(&self, name: &str) -> bool {
        self.take_slot((TypeId::of::<S>(), Some(name.to_string())))
    }

    /// 当前记录的不同请求者个数
    pub fn tracked_count(&self) -> usize {
        let tracked = self.tracked.lock();
        let mut keys: Vec<RequestKey> = Vec::new();
        for requestor in tracked.values().flatten() {
            let key = requestor.key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys.len()
    }

    pub fn is_recording(&self) -> bool {
        self.paused.load(Ordering::SeqCst) == 0
    }

    /// 释放提供者：通知所有记录的请求者，之后不再记录它们
    pub fn dispose(&self) {
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let supplier: SupplierRef = this;
        let requestors = dedup(self.tracked.lock().drain().flat_map(|(_, list)| list).collect());
        debug!("映射表提供者释放，通知 {} 个请求者", requestors.len());
        for requestor in requestors {
            if let Err(e) = requestor.disposed(&supplier) {
                warn!("请求者 {} 处理提供者释放失败: {}", requestor.location(), e);
            }
        }
    }

    /// 停止为对象重新注入，并通过它的请求者把对象从本提供者上拆除。
    /// 对象没有被本提供者记录时返回 `false`
    pub fn uninject(&self, object: &ObjectRef) -> InjectionResult<bool> {
        let Some(this) = self.self_ref.upgrade() else {
            return Ok(false);
        };
        let supplier: SupplierRef = this;
        let Some(requestor) = self.remove_listeners_to(object) else {
            return Ok(false);
        };
        requestor.uninject(object, &supplier)
    }

    /// 移除对象的全部请求者，返回其中一个
    fn remove_listeners_to(&self, object: &ObjectRef) -> Option<Arc<dyn Requestor>> {
        let id = object_id(object);
        let belongs = |requestor: &Arc<dyn Requestor>| {
            requestor
                .requesting_object()
                .is_some_and(|current| object_id(&current) == id)
        };
        let mut found = None;
        let mut tracked = self.tracked.lock();
        for list in tracked.values_mut() {
            list.retain(|requestor| {
                if belongs(requestor) {
                    found.get_or_insert_with(|| requestor.clone());
                    false
                } else {
                    true
                }
            });
        }
        tracked.retain(|_, list| !list.is_empty());
        found
    }

    fn put(&self, slot: Slot, item: Value) {
        self.values.write().insert(slot.clone(), item);
        self.notify(&slot);
    }

    fn take_slot(&self, slot: Slot) -> bool {
        let removed = self.values.write().remove(&slot).is_some();
        if removed {
            self.notify(&slot);
        }
        removed
    }

    /// 重新执行读取过该槽位的请求者。重新解析时请求者会再次被记录
    fn notify(&self, slot: &Slot) {
        let Some(requestors) = self.tracked.lock().remove(slot) else {
            return;
        };
        for requestor in dedup(requestors) {
            if !requestor.is_valid() {
                debug!("请求对象已回收，不再通知 {}", requestor.location());
                continue;
            }
            let outcome = requestor
                .resolve_arguments(false)
                .and_then(|()| requestor.execute());
            if let Err(e) = outcome {
                warn!("重新注入 {} 失败: {}", requestor.location(), e);
            }
        }
    }

    fn record(&self, slot: Slot, requestor: &Arc<dyn Requestor>) {
        let key = requestor.key();
        let mut tracked = self.tracked.lock();
        let list = tracked.entry(slot).or_default();
        list.retain(|existing| existing.is_valid());
        if !list.iter().any(|existing| existing.key() == key) {
            list.push(requestor.clone());
        }
    }
}

fn dedup(requestors: Vec<Arc<dyn Requestor>>) -> Vec<Arc<dyn Requestor>> {
    let mut unique: Vec<Arc<dyn Requestor>> = Vec::with_capacity(requestors.len());
    for requestor in requestors {
        let key = requestor.key();
        if !unique.iter().any(|existing| existing.key() == key) {
            unique.push(requestor);
        }
    }
    unique
}

impl PrimaryObjectSupplier for MapObjectSupplier {
    fn get(
        &self,
        descriptors: &[Option<ObjectDescriptor>],
        values: &mut [Arg],
        requestor: Option<&Arc<dyn Requestor>>,
        _initial: bool,
        track: bool,
        _group_updates: bool,
    ) {
        let recording = track && self.is_recording();
        let stored = self.values.read();
        for (descriptor, arg) in descriptors.iter().zip(values.iter_mut()) {
            let Some(descriptor) = descriptor else {
                continue;
            };
            let slot = slot_of(descriptor);
            if !arg.is_resolved() {
                if let Some(found) = stored.get(&slot) {
                    *arg = Arg::Value(found.clone());
                }
            }
            if let (true, Some(requestor)) = (recording, requestor) {
                self.record(slot, requestor);
            }
        }
    }

    fn pause_recording(&self) {
        self.paused.fetch_add(1, Ordering::SeqCst);
    }

    fn resume_recording(&self) {
        let _ = self
            .paused
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl std::fmt::Debug for MapObjectSupplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapObjectSupplier")
            .field("values", &self.values.read().len())
            .field("recording", &self.is_recording())
            .finish()
    }
}

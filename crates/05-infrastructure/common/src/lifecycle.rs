//! 组件生命周期管理

/// 可释放对象
///
/// 对象提供者被释放时，在所有 pre-destroy 回调之后调用
pub trait Disposable: Send + Sync {
    fn dispose(&mut self);
}

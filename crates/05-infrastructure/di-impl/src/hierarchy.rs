//! 类型层级与注入计划
//!
//! 注入计划按具体类型只构建一次：从具体类型沿父类型链向上展开，
//! 记录每一层相对于根对象的投影，并预先判定哪些父类型方法已被重写。

use crate::cache::MetadataCache;
use di_abstractions::{compose, ClassMeta, ClassRef, MethodDecl, Projection};
use infrastructure_common::{InjectionError, InjectionResult, Location, MemberKind, Visibility};
use std::collections::HashSet;
use std::sync::Arc;

/// 注入计划中的一层
pub(crate) struct Level {
    pub(crate) meta: Arc<ClassMeta>,
    /// 从根对象取出本层对象，根层为 `None`
    pub(crate) project: Option<Projection>,
}

impl Level {
    pub(crate) fn method_location(&self, index: usize) -> Location {
        Location::new(
            self.meta.key,
            MemberKind::Method,
            index,
            self.meta.methods[index].name,
        )
    }

    pub(crate) fn field_location(&self, index: usize) -> Location {
        Location::new(
            self.meta.key,
            MemberKind::Field,
            index,
            self.meta.fields[index].name,
        )
    }
}

pub(crate) struct ClassPlan {
    pub(crate) class: ClassRef,
    /// 派生类型在前
    levels: Vec<Level>,
    /// `overridden[层][方法]`
    overridden: Vec<Vec<bool>>,
}

fn too_deep(class: ClassRef, max_depth: usize) -> InjectionError {
    InjectionError::incompatible(class.name(), format!("继承层级超过 {max_depth} 层"))
}

impl ClassPlan {
    /// 计划在全局缓存中共享，每个注入器按自己的层级上限再检查一次
    pub(crate) fn check_depth(&self, max_depth: usize) -> InjectionResult<()> {
        if self.levels.len() > max_depth {
            return Err(too_deep(self.class, max_depth));
        }
        Ok(())
    }

    pub(crate) fn build(
        cache: &MetadataCache,
        class: ClassRef,
        max_depth: usize,
    ) -> InjectionResult<Self> {
        let mut levels: Vec<Level> = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some((class, None::<Projection>));

        while let Some((current, project)) = next.take() {
            if !seen.insert(current.key().id) {
                return Err(InjectionError::incompatible(
                    class.name(),
                    format!("父类型链在 {} 处形成环", current.name()),
                ));
            }
            if levels.len() >= max_depth {
                return Err(too_deep(class, max_depth));
            }
            let meta = cache.class_meta(current);
            next = meta.parent.as_ref().map(|parent| {
                let to_parent = match &project {
                    Some(outer) => compose(outer.clone(), parent.project.clone()),
                    None => parent.project.clone(),
                };
                (parent.class, Some(to_parent))
            });
            levels.push(Level { meta, project });
        }

        let root = class.key().id;
        let overridden = levels
            .iter()
            .enumerate()
            .map(|(depth, level)| {
                (0..level.meta.methods.len())
                    .map(|index| {
                        depth > 0
                            && cache.is_overridden(root, level.method_location(index), || {
                                let method = &level.meta.methods[index];
                                levels[..depth]
                                    .iter()
                                    .any(|derived| overrides(&level.meta, method, &derived.meta))
                            })
                    })
                    .collect::<Vec<bool>>()
            })
            .collect();

        Ok(Self {
            class,
            levels,
            overridden,
        })
    }

    pub(crate) fn root(&self) -> &Level {
        &self.levels[0]
    }

    /// 派生类型在前
    pub(crate) fn derived_first(&self) -> impl Iterator<Item = (usize, &Level)> {
        self.levels.iter().enumerate()
    }

    /// 父类型在前
    pub(crate) fn ancestors_first(&self) -> impl Iterator<Item = (usize, &Level)> {
        self.levels.iter().enumerate().rev()
    }

    pub(crate) fn is_overridden(&self, level: usize, method: usize) -> bool {
        self.overridden
            .get(level)
            .and_then(|methods| methods.get(method))
            .copied()
            .unwrap_or(false)
    }
}

/// `derived` 中是否有方法重写了 `ancestor` 声明的 `method`
fn overrides(ancestor: &ClassMeta, method: &MethodDecl, derived: &ClassMeta) -> bool {
    if method.is_static || method.visibility == Visibility::Private {
        return false;
    }
    let redeclared = derived
        .methods
        .iter()
        .any(|candidate| !candidate.is_static && candidate.same_signature(method));
    if !redeclared {
        return false;
    }
    match method.visibility {
        Visibility::Package => ancestor.module == derived.module,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{ClassBuilder, Injectable, Param};

    #[derive(Default)]
    struct Base;

    impl Injectable for Base {
        fn describe(class: &mut ClassBuilder<Self>) {
            class.default_constructor();
            class.method("start", |_, _| Ok(None)).post_construct();
            class
                .method("configure", |_, _| Ok(None))
                .inject()
                .arg(Param::of::<String>());
            class
                .method("hidden", |_, _| Ok(None))
                .inject()
                .visibility(Visibility::Private);
            class
                .method("local", |_, _| Ok(None))
                .inject()
                .visibility(Visibility::Package)
                .arg(Param::of::<u8>());
        }
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
    }

    impl Injectable for Derived {
        fn describe(class: &mut ClassBuilder<Self>) {
            class.extends(|this: &mut Self| &mut this.base);
            class.default_constructor();
            class.method("start", |_, _| Ok(None)).post_construct();
            class
                .method("configure", |_, _| Ok(None))
                .inject()
                .arg(Param::of::<u32>());
            class.method("hidden", |_, _| Ok(None)).inject();
            class
                .method("local", |_, _| Ok(None))
                .inject()
                .arg(Param::of::<u8>())
                .visibility(Visibility::Package);
        }
    }

    #[derive(Default)]
    struct Elsewhere {
        base: Base,
    }

    impl Injectable for Elsewhere {
        fn describe(class: &mut ClassBuilder<Self>) {
            class.extends(|this: &mut Self| &mut this.base);
            class.module("other::module");
            class
                .method("local", |_, _| Ok(None))
                .inject()
                .arg(Param::of::<u8>());
        }
    }

    #[test]
    fn overridden_methods_are_detected() {
        let cache = MetadataCache::default();
        let plan = ClassPlan::build(&cache, ClassRef::of::<Derived>(), 64).unwrap();
        // 第 1 层是 Base
        assert!(plan.is_overridden(1, 0), "same signature overrides");
        assert!(!plan.is_overridden(1, 1), "different parameter types do not");
        assert!(!plan.is_overridden(1, 2), "private methods are never overridden");
        assert!(plan.is_overridden(1, 3), "package method in same module");
        assert!(!plan.is_overridden(0, 0));
    }

    #[test]
    fn package_methods_across_modules_are_not_overridden() {
        let cache = MetadataCache::default();
        let plan = ClassPlan::build(&cache, ClassRef::of::<Elsewhere>(), 64).unwrap();
        assert!(!plan.is_overridden(1, 3));
    }

    #[test]
    fn levels_iterate_in_both_directions() {
        let cache = MetadataCache::default();
        let plan = ClassPlan::build(&cache, ClassRef::of::<Derived>(), 64).unwrap();
        let down: Vec<_> = plan.derived_first().map(|(_, l)| l.meta.key).collect();
        let up: Vec<_> = plan.ancestors_first().map(|(_, l)| l.meta.key).collect();
        assert_eq!(down[0], ClassRef::of::<Derived>().key());
        assert_eq!(up[0], ClassRef::of::<Base>().key());
        assert!(plan.root().project.is_none());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let cache = MetadataCache::default();
        let error = ClassPlan::build(&cache, ClassRef::of::<Derived>(), 1)
            .err()
            .unwrap();
        assert!(matches!(error, InjectionError::IncompatibleClass { .. }));
    }

    #[test]
    fn shared_plan_rechecks_smaller_limit() {
        let cache = MetadataCache::default();
        let plan = ClassPlan::build(&cache, ClassRef::of::<Derived>(), 64).unwrap();
        assert!(plan.check_depth(2).is_ok());
        let error = plan.check_depth(1).err().unwrap();
        assert!(matches!(error, InjectionError::IncompatibleClass { .. }));
    }
}

use super::*;
use crate::call_site::{CallSiteCounts, GuardState};
use crate::category::Category;
use crate::errors::DispatchError;
use crate::registry::native;
use crate::shape::ShapePair;
use crate::TypeKind;
use pretty_assertions::assert_eq;

fn arr() -> Value {
    Value::int_array(vec![10, 20, 30])
}

#[test]
fn call_sites_are_created_lazily_and_reused() {
    let runtime = FastPathRuntime::new();
    assert_eq!(runtime.call_site_count(), 0);

    let a = runtime.call_site(CallSiteId::new(1));
    let b = runtime.call_site(CallSiteId::new(1));
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(runtime.call_site_count(), 1);

    runtime.call_site(CallSiteId::new(2));
    assert_eq!(runtime.call_site_count(), 2);
}

#[test]
fn call_sites_are_independent() {
    let runtime = FastPathRuntime::new();
    let hot = CallSiteId::new(1);
    let mixed = CallSiteId::new(2);

    runtime.dispatch(hot, &arr(), &Value::int(0)).ok();
    runtime.dispatch(mixed, &arr(), &Value::int(0)).ok();
    runtime
        .dispatch(mixed, &Value::list(vec![Value::int(1)]), &Value::int(0))
        .ok();

    assert_eq!(
        runtime.call_site(hot).state(),
        GuardState::Specializing(ShapePair::INT_ARRAY_INDEX)
    );
    assert_eq!(runtime.call_site(mixed).state(), GuardState::PermanentlyGeneric);
}

#[test]
fn disabled_fast_path_never_binds() {
    let runtime = FastPathRuntime::builder()
        .config(DispatchConfig::default().with_fast_path(false))
        .build();
    let site = CallSiteId::new(9);

    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(-1)), Ok(Value::int(30)));
    assert_eq!(
        runtime.dispatch(site, &arr(), &Value::int(3)),
        Err(DispatchError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(runtime.call_site_count(), 0);
    assert_eq!(runtime.call_site(site).counts(), CallSiteCounts::default());
}

#[test]
fn builder_shares_eligibility() {
    let eligibility = Arc::new(EligibilityState::new());
    let runtime = FastPathRuntime::builder()
        .eligibility(Arc::clone(&eligibility))
        .build();
    assert!(Arc::ptr_eq(runtime.eligibility(), &eligibility));
    assert!(Arc::ptr_eq(runtime.registry().eligibility(), &eligibility));

    runtime.registry().install_handle(Arc::new(NoOpHandle));
    assert!(eligibility.snapshot().must_force_generic());
}

struct NoOpHandle;

impl crate::registry::ResolutionHandle for NoOpHandle {
    fn resolve(&self, _receiver: &Value, _method: &str) -> Option<crate::NativeMethod> {
        None
    }
}

#[test]
fn override_is_seen_by_bound_site() {
    let runtime = FastPathRuntime::new();
    let site = CallSiteId::new(3);
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));

    runtime
        .registry()
        .register_override(TypeKind::IntArray, methods::GET_AT, native(|_, _| Ok(Value::int(-1))));
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(-1)));

    runtime.registry().remove_override(TypeKind::IntArray, methods::GET_AT);
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));
    assert_eq!(
        runtime.call_site(site).counts(),
        CallSiteCounts {
            specialized: 2,
            generic: 1,
            demotions: 0,
        }
    );
}

#[test]
fn category_method_is_seen_during_block() {
    let runtime = FastPathRuntime::new();
    let site = CallSiteId::new(4);
    let category = Arc::new(Category::new("Doubled").with_method(
        TypeKind::IntArray,
        methods::GET_AT,
        |recv, args| {
            let index = args.first().cloned().unwrap_or(Value::int(0));
            let base = crate::array_access::get_at(recv, &index)?;
            Ok(Value::int(base.as_int().unwrap_or_default() * 2))
        },
    ));

    let during = runtime
        .registry()
        .with_category(category, || runtime.dispatch(site, &arr(), &Value::int(1)));
    assert_eq!(during, Ok(Value::int(40)));
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(1)), Ok(Value::int(20)));
}

#[test]
fn invoke_reaches_other_builtins() {
    let runtime = FastPathRuntime::new();
    assert_eq!(runtime.invoke(&arr(), methods::SIZE, &[]), Ok(Value::int(3)));
    assert_eq!(runtime.invoke(&Value::int(-4), methods::ABS, &[]), Ok(Value::int(4)));
    assert_eq!(
        runtime.invoke(&Value::int(2), methods::PLUS, &[Value::int(3)]),
        Ok(Value::int(5))
    );
}

#[test]
fn global_runtime_uses_global_eligibility() {
    let runtime = FastPathRuntime::global();
    assert!(std::ptr::eq(runtime, FastPathRuntime::global()));
    assert!(Arc::ptr_eq(runtime.eligibility(), &EligibilityState::global()));
}

//! End-to-end dispatch scenarios through `FastPathRuntime`.

use std::sync::Arc;

use ori_fastpath::methods::GET_AT;
use ori_fastpath::{
    native, CallSiteCounts, CallSiteId, Category, DispatchConfig, DispatchError,
    EligibilityState, FastPathFamily, FastPathRuntime, GuardState, NativeMethod,
    ResolutionHandle, ShapePair, TypeKind, Value, NO_FASTPATH_ENV,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn arr() -> Value {
    Value::int_array(vec![10, 20, 30])
}

/// Resolves `get_at` to a constant, declines everything else.
struct Constant(i64);

impl ResolutionHandle for Constant {
    fn resolve(&self, _receiver: &Value, method: &str) -> Option<NativeMethod> {
        let n = self.0;
        (method == GET_AT).then(|| native(move |_, _| Ok(Value::int(n))))
    }

    fn name(&self) -> &str {
        "constant"
    }
}

#[test]
fn handle_disables_and_restores_int_array_eligibility() {
    let runtime = FastPathRuntime::new();
    let eligibility = runtime.eligibility();

    runtime.registry().install_handle(Arc::new(Constant(0)));
    let snapshot = eligibility.snapshot();
    assert!(snapshot.flags().int_array_unmodified);
    assert!(!snapshot.int_array_fast_path_eligible());
    assert!(!eligibility.is_eligible(FastPathFamily::IntArray));

    runtime.registry().remove_handle();
    let snapshot = eligibility.snapshot();
    assert!(snapshot.int_array_fast_path_eligible());
    assert!(eligibility.is_eligible(FastPathFamily::IntArray));
}

#[test]
fn category_forces_generic_regardless_of_shape_flags() {
    let runtime = FastPathRuntime::new();
    let category = Arc::new(Category::new("Empty"));

    {
        let _active = runtime.registry().use_category(category);
        let snapshot = runtime.eligibility().snapshot();
        assert!(snapshot.flags().handle_absent);
        assert!(snapshot.flags().int_array_unmodified);
        assert!(snapshot.must_force_generic());
        assert!(!snapshot.is_eligible(FastPathFamily::IntArray));
        assert!(!snapshot.is_eligible(FastPathFamily::IntScalar));
    }

    assert!(!runtime.eligibility().snapshot().must_force_generic());
    assert!(runtime.eligibility().is_eligible(FastPathFamily::IntArray));
}

#[test]
fn fast_and_generic_paths_agree() {
    let runtime = FastPathRuntime::new();
    let site = CallSiteId::new(1);

    let cases = [
        (-1, Ok(Value::int(30))),
        (0, Ok(Value::int(10))),
        (3, Err(DispatchError::IndexOutOfRange { index: 3, len: 3 })),
        (-4, Err(DispatchError::IndexOutOfRange { index: -4, len: 3 })),
    ];
    for (index, expected) in cases {
        let index = Value::int(index);
        assert_eq!(runtime.dispatch(site, &arr(), &index), expected);
        assert_eq!(runtime.invoke(&arr(), GET_AT, &[index]), expected);
    }

    let guard = runtime.call_site(site);
    assert_eq!(guard.state(), GuardState::Specializing(ShapePair::INT_ARRAY_INDEX));
    assert_eq!(guard.counts().specialized, 4);
    assert_eq!(guard.counts().generic, 0);
}

#[test]
fn polymorphic_site_stays_generic() {
    let runtime = FastPathRuntime::new();
    let site = CallSiteId::new(2);
    let floats = Value::float_array(vec![0.5, 1.5]);

    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));
    assert_eq!(runtime.dispatch(site, &floats, &Value::int(1)), Ok(Value::Float(1.5)));
    for _ in 0..4 {
        assert_eq!(runtime.dispatch(site, &arr(), &Value::int(2)), Ok(Value::int(30)));
    }

    let guard = runtime.call_site(site);
    assert_eq!(guard.state(), GuardState::PermanentlyGeneric);
    assert_eq!(
        guard.counts(),
        CallSiteCounts {
            specialized: 1,
            generic: 5,
            demotions: 1,
        }
    );
}

#[test]
fn handle_toggle_pauses_and_resumes_bound_site() {
    let runtime = FastPathRuntime::new();
    let site = CallSiteId::new(3);
    let bound = GuardState::Specializing(ShapePair::INT_ARRAY_INDEX);

    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(1)), Ok(Value::int(20)));
    assert_eq!(runtime.call_site(site).state(), bound);

    runtime.registry().install_handle(Arc::new(Constant(99)));
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(1)), Ok(Value::int(99)));
    assert_eq!(runtime.call_site(site).state(), bound);

    runtime.registry().remove_handle();
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(1)), Ok(Value::int(20)));
    assert_eq!(runtime.call_site(site).state(), bound);
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
fn redefined_int_array_get_at_is_honored() {
    let runtime = FastPathRuntime::new();
    let site = CallSiteId::new(4);
    runtime.dispatch(site, &arr(), &Value::int(0)).ok();

    runtime.registry().register_override(
        TypeKind::IntArray,
        GET_AT,
        native(|_, _| Ok(Value::string("redefined"))),
    );
    assert!(!runtime.eligibility().is_eligible(FastPathFamily::IntArray));
    assert_eq!(
        runtime.dispatch(site, &arr(), &Value::int(0)),
        Ok(Value::string("redefined"))
    );

    assert_eq!(runtime.registry().clear_overrides(TypeKind::IntArray), 1);
    assert!(runtime.eligibility().is_eligible(FastPathFamily::IntArray));
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));
}

#[test]
fn int_scalar_redefinition_leaves_arrays_eligible() {
    let runtime = FastPathRuntime::new();
    runtime
        .registry()
        .register_override(TypeKind::Int, "abs", native(|_, _| Ok(Value::int(0))));

    assert!(!runtime.eligibility().is_eligible(FastPathFamily::IntScalar));
    assert!(runtime.eligibility().is_eligible(FastPathFamily::IntArray));
}

#[test]
fn nested_categories_keep_generic_until_last_exits() {
    let runtime = FastPathRuntime::new();
    let registry = runtime.registry();
    let outer = Arc::new(Category::new("Outer").with_method(TypeKind::IntArray, GET_AT, |_, _| {
        Ok(Value::int(1))
    }));
    let inner = Arc::new(Category::new("Inner").with_method(TypeKind::IntArray, GET_AT, |_, _| {
        Ok(Value::int(2))
    }));
    let site = CallSiteId::new(5);

    let (in_outer, in_inner) = registry.with_category(outer, || {
        let in_inner = registry.with_category(inner, || runtime.dispatch(site, &arr(), &Value::int(0)));
        (runtime.dispatch(site, &arr(), &Value::int(0)), in_inner)
    });
    assert_eq!(in_inner, Ok(Value::int(2)));
    assert_eq!(in_outer, Ok(Value::int(1)));
    assert_eq!(runtime.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));
    assert_eq!(runtime.call_site(site).state(), GuardState::Specializing(ShapePair::INT_ARRAY_INDEX));
}

#[test]
fn disabled_config_serves_everything_generically() {
    let runtime = FastPathRuntime::builder()
        .config(DispatchConfig { fast_path: false })
        .build();
    let site = CallSiteId::new(6);

    for _ in 0..3 {
        assert_eq!(runtime.dispatch(site, &arr(), &Value::int(-1)), Ok(Value::int(30)));
    }
    assert_eq!(runtime.call_site(site).counts(), CallSiteCounts::default());
    assert_eq!(runtime.call_site(site).state(), GuardState::Unbound);
}

#[test]
fn environment_switch_disables_fast_path() {
    std::env::set_var(NO_FASTPATH_ENV, "1");
    let disabled = DispatchConfig::from_env();
    std::env::remove_var(NO_FASTPATH_ENV);
    let enabled = DispatchConfig::from_env();

    assert!(!disabled.fast_path);
    assert!(enabled.fast_path);
}

#[test]
fn runtimes_sharing_eligibility_honor_each_others_handles() {
    let shared = Arc::new(EligibilityState::new());
    let a = FastPathRuntime::builder().eligibility(Arc::clone(&shared)).build();
    let b = FastPathRuntime::builder().eligibility(Arc::clone(&shared)).build();
    let site = CallSiteId::new(1);

    assert_eq!(b.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));
    b.registry().install_handle(Arc::new(Constant(-999)));

    a.registry().install_handle(Arc::new(Constant(0)));
    a.registry().remove_handle();

    assert_eq!(b.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(-999)));
    assert_eq!(
        b.dispatch(site, &arr(), &Value::int(0)),
        b.invoke(&arr(), GET_AT, &[Value::int(0)])
    );

    b.registry().remove_handle();
    assert_eq!(b.dispatch(site, &arr(), &Value::int(0)), Ok(Value::int(10)));
    assert_eq!(b.call_site(site).counts().specialized, 2);
}

#[test]
fn runtimes_sharing_eligibility_honor_each_others_categories() {
    let shared = Arc::new(EligibilityState::new());
    let a = FastPathRuntime::builder().eligibility(Arc::clone(&shared)).build();
    let b = FastPathRuntime::builder().eligibility(Arc::clone(&shared)).build();
    let site = CallSiteId::new(1);
    let negated = Arc::new(Category::new("Negated").with_method(
        TypeKind::IntArray,
        GET_AT,
        |_, _| Ok(Value::int(-1)),
    ));

    b.dispatch(site, &arr(), &Value::int(0)).ok();
    let in_b = b.registry().with_category(negated, || {
        a.registry().with_category(Arc::new(Category::new("Empty")), || {});
        b.dispatch(site, &arr(), &Value::int(0))
    });
    assert_eq!(in_b, Ok(Value::int(-1)));
}

proptest! {
    #[test]
    fn bound_site_agrees_with_generic_dispatch(
        items in proptest::collection::vec(any::<i64>(), 0..16),
        indices in proptest::collection::vec(any::<i64>(), 1..16),
    ) {
        let runtime = FastPathRuntime::new();
        let site = CallSiteId::new(1);
        let receiver = Value::int_array(items);

        for index in indices {
            let index = Value::int(index);
            let fast = runtime.dispatch(site, &receiver, &index);
            let generic = runtime.invoke(&receiver, GET_AT, std::slice::from_ref(&index));
            prop_assert_eq!(fast, generic);
        }
        prop_assert_eq!(
            runtime.call_site(site).state(),
            GuardState::Specializing(ShapePair::INT_ARRAY_INDEX)
        );
        prop_assert_eq!(runtime.call_site(site).counts().generic, 0);
    }
}

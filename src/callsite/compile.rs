//! Lowering a call-site graph into a specialized closure.
//!
//! The compiled accessor evaluates exactly what [`CallSite::resolve_value`]
//! evaluates, in the same order. Arguments that are all constants are bound
//! once up front instead of being collected on every call.

use std::sync::Arc;

use crate::descriptors::AnyArc;
use crate::error::DiResult;
use crate::invoke::ArgumentValues;
use crate::provider::{ProviderCore, ResolverContext};

use super::CallSite;

/// Value-producing routine of a service.
pub(crate) type Accessor = Arc<dyn Fn(&dyn ProviderCore) -> DiResult<AnyArc> + Send + Sync>;

pub(crate) fn compile(call_site: &CallSite) -> Accessor {
    match call_site {
        CallSite::Value(value) => {
            let value = value.clone();
            Arc::new(move |_: &dyn ProviderCore| Ok(value.clone()))
        }
        CallSite::Service(service) => {
            let service = service.clone();
            Arc::new(move |provider: &dyn ProviderCore| service.resolve_dependency(provider))
        }
        CallSite::Constructor { constructor, arguments } => {
            let constructor = constructor.clone();
            match constant_arguments(arguments) {
                Some(bound) => Arc::new(move |_: &dyn ProviderCore| constructor.call(&bound)),
                None => {
                    let arguments = compile_arguments(arguments);
                    Arc::new(move |provider: &dyn ProviderCore| {
                        let values = evaluate(&arguments, provider)?;
                        constructor.call(&values)
                    })
                }
            }
        }
        CallSite::Factory { factory, arguments } => {
            let factory = factory.clone();
            match constant_arguments(arguments) {
                Some(bound) => Arc::new(move |provider: &dyn ProviderCore| {
                    factory.call(&ResolverContext::new(provider.as_resolver()), &bound)
                }),
                None => {
                    let arguments = compile_arguments(arguments);
                    Arc::new(move |provider: &dyn ProviderCore| {
                        let values = evaluate(&arguments, provider)?;
                        factory.call(&ResolverContext::new(provider.as_resolver()), &values)
                    })
                }
            }
        }
        CallSite::Enumerable { enumerable, elements } => {
            let enumerable = enumerable.clone();
            let elements: Vec<Accessor> = elements.iter().map(compile).collect();
            Arc::new(move |provider: &dyn ProviderCore| {
                let values = elements
                    .iter()
                    .map(|element| element(provider))
                    .collect::<DiResult<Vec<_>>>()?;
                enumerable.collect(values)
            })
        }
    }
}

/// Pre-bound argument values when no argument depends on the provider.
fn constant_arguments(arguments: &[Option<CallSite>]) -> Option<ArgumentValues> {
    arguments
        .iter()
        .map(|argument| match argument {
            None => Some(None),
            Some(CallSite::Value(value)) => Some(Some(value.clone())),
            Some(_) => None,
        })
        .collect()
}

fn compile_arguments(arguments: &[Option<CallSite>]) -> Vec<Option<Accessor>> {
    arguments.iter().map(|argument| argument.as_ref().map(compile)).collect()
}

fn evaluate(arguments: &[Option<Accessor>], provider: &dyn ProviderCore) -> DiResult<ArgumentValues> {
    arguments
        .iter()
        .map(|argument| argument.as_ref().map(|accessor| accessor(provider)).transpose())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::{Constructor, Parameter};

    #[test]
    fn constant_arguments_are_bound() {
        let arguments = vec![Some(CallSite::Value(Arc::new(2u8) as AnyArc)), None];
        let bound = constant_arguments(&arguments).unwrap();
        assert_eq!(bound.len(), 2);
        assert!(bound[1].is_none());

        let constructor = Constructor::new::<u16, _>(
            vec![Parameter::new::<u8>("a"), Parameter::optional::<u8>("b")],
            |args| Ok(u16::from(*args.get::<u8>(0)?) * 10),
        );
        let value = constructor.call(&bound).unwrap().downcast::<u16>().unwrap();
        assert_eq!(*value, 20);
    }

    #[test]
    fn nested_constructor_is_not_constant() {
        let inner = CallSite::Constructor {
            constructor: Constructor::new::<u8, _>(Vec::new(), |_| Ok(1u8)),
            arguments: Vec::new(),
        };
        assert!(constant_arguments(&[Some(inner)]).is_none());
    }
}

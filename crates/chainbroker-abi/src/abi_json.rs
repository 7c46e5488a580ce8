//! Contract descriptors from standard Ethereum ABI JSON.

use alloy_json_abi::{JsonAbi, Param as JsonParam, StateMutability};
use chainbroker_core::{
    AbiError, ConstructorDescriptor, ContractDescriptor, EventDescriptor, EventParam,
    FunctionDescriptor, Param, TypeDescriptor,
};

/// Builds a descriptor from an ABI JSON array.
///
/// Anonymous events are skipped: their logs carry no topic to match on.
pub fn contract_from_abi_json(
    id: impl Into<String>,
    name: impl Into<String>,
    abi_json: &str,
) -> Result<ContractDescriptor, AbiError> {
    let abi: JsonAbi = serde_json::from_str(abi_json).map_err(|e| AbiError::InvalidDescriptor {
        reason: format!("invalid ABI JSON: {e}"),
    })?;

    let mut contract = ContractDescriptor::new(id, name);

    if let Some(constructor) = abi.constructor() {
        contract.constructors.push(ConstructorDescriptor {
            inputs: params(&constructor.inputs)?,
        });
    }

    for function in abi.functions() {
        let read_only = matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        );
        contract.add_function(FunctionDescriptor::new(
            function.name.clone(),
            params(&function.inputs)?,
            params(&function.outputs)?,
            read_only,
        ))?;
    }

    for event in abi.events().filter(|e| !e.anonymous) {
        let event_params = event
            .inputs
            .iter()
            .map(|p| {
                Ok(EventParam::new(
                    p.name.clone(),
                    type_from_json(&p.ty, &p.components)?,
                    p.indexed,
                ))
            })
            .collect::<Result<Vec<_>, AbiError>>()?;
        contract.add_event(EventDescriptor::new(event.name.clone(), event_params));
    }

    Ok(contract)
}

fn params(inputs: &[JsonParam]) -> Result<Vec<Param>, AbiError> {
    inputs
        .iter()
        .map(|p| Ok(Param::new(p.name.clone(), type_from_json(&p.ty, &p.components)?)))
        .collect()
}

/// Resolves a JSON `type` string, expanding `tuple`, `tuple[]`, `tuple[2][]`
/// against the parameter's components.
fn type_from_json(ty: &str, components: &[JsonParam]) -> Result<TypeDescriptor, AbiError> {
    let Some(suffix) = ty.strip_prefix("tuple") else {
        return ty.parse();
    };
    let mut resolved = TypeDescriptor::Tuple(params(components)?);
    let mut rest = suffix;
    while !rest.is_empty() {
        let close = rest
            .find(']')
            .filter(|_| rest.starts_with('['))
            .ok_or_else(|| AbiError::InvalidType { ty: ty.to_string() })?;
        let len = &rest[1..close];
        resolved = if len.is_empty() {
            TypeDescriptor::dynamic_array(resolved)
        } else {
            let n = len
                .parse()
                .map_err(|_| AbiError::InvalidType { ty: ty.to_string() })?;
            TypeDescriptor::fixed_array(resolved, n)
        };
        rest = &rest[close + 1..];
    }
    Ok(resolved)
}

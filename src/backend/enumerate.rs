// Two-call enumeration
//
// Every Vulkan list query is called twice: once with a null buffer to get the
// count, then again into a buffer of that size. Both calls are checked against
// their result code and a non-zero count.

use super::error::{BootstrapError, Result};
use ash::vk;

/// Run a two-call enumeration.
///
/// # Safety
/// `call` must behave like a Vulkan enumeration: when handed a non-null
/// pointer it writes at most `*count` elements there and updates `*count` to
/// the number written.
pub unsafe fn enumerate<T, F>(what: &'static str, mut call: F) -> Result<Vec<T>>
where
    F: FnMut(&mut u32, *mut T) -> vk::Result,
{
    let mut count = 0;
    check(what, call(&mut count, std::ptr::null_mut()), count)?;

    let mut items = Vec::with_capacity(count as usize);
    check(what, call(&mut count, items.as_mut_ptr()), count)?;
    debug_assert!(count as usize <= items.capacity());
    items.set_len((count as usize).min(items.capacity()));

    Ok(items)
}

fn check(what: &'static str, result: vk::Result, count: u32) -> Result<()> {
    if result != vk::Result::SUCCESS {
        return Err(BootstrapError::EnumerationFailed { what, result });
    }
    if count == 0 {
        return Err(BootstrapError::EmptyEnumeration { what });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(values: &[u32]) -> impl FnMut(&mut u32, *mut u32) -> vk::Result + '_ {
        move |count, out| {
            if out.is_null() {
                *count = values.len() as u32;
            } else {
                let n = (*count as usize).min(values.len());
                for (i, value) in values.iter().take(n).enumerate() {
                    unsafe { out.add(i).write(*value) };
                }
                *count = n as u32;
            }
            vk::Result::SUCCESS
        }
    }

    #[test]
    fn returns_every_entry() {
        let items = unsafe { enumerate("queue family", fill(&[4, 8, 15])) }.unwrap();
        assert_eq!(items, vec![4, 8, 15]);
    }

    #[test]
    fn zero_count_is_a_failure() {
        let err = unsafe { enumerate("physical device", fill(&[])) }.unwrap_err();
        assert!(matches!(err, BootstrapError::EmptyEnumeration { what: "physical device" }));
    }

    #[test]
    fn failing_count_query_never_reaches_the_buffer_query() {
        let mut calls = 0;
        let err = unsafe {
            enumerate::<u32, _>("device extension", |count, _| {
                calls += 1;
                *count = 3;
                vk::Result::ERROR_INITIALIZATION_FAILED
            })
        }
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(
            err,
            BootstrapError::EnumerationFailed { result: vk::Result::ERROR_INITIALIZATION_FAILED, .. }
        ));
    }

    #[test]
    fn second_call_is_validated_too() {
        let err = unsafe {
            enumerate::<u32, _>("surface format", |count, out| {
                if out.is_null() {
                    *count = 2;
                    vk::Result::SUCCESS
                } else {
                    vk::Result::INCOMPLETE
                }
            })
        }
        .unwrap_err();
        assert!(matches!(err, BootstrapError::EnumerationFailed { result: vk::Result::INCOMPLETE, .. }));
    }

    #[test]
    fn list_shrinking_between_calls_to_zero_fails() {
        let err = unsafe {
            enumerate::<u32, _>("present mode", |count, out| {
                *count = if out.is_null() { 2 } else { 0 };
                vk::Result::SUCCESS
            })
        }
        .unwrap_err();
        assert!(matches!(err, BootstrapError::EmptyEnumeration { what: "present mode" }));
    }
}

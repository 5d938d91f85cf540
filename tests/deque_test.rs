use yagma::{Deque, Steal};

#[test]
fn test_empty_deque() {
    let d: Deque<i32> = Deque::new();

    assert!(d.is_empty());
    assert_eq!(d.len(), 0);
    assert_eq!(d.pop(), None);
    assert_eq!(d.steal(), Steal::Empty);

    // Repeated operations on an empty deque stay empty.
    assert_eq!(d.pop(), None);
    assert_eq!(d.steal(), Steal::Empty);
}

#[test]
fn test_owner_lifo_order() {
    let d = Deque::new();

    d.push(1);
    d.push(2);
    d.push(3);
    assert_eq!(d.len(), 3);

    assert_eq!(d.pop(), Some(3));
    assert_eq!(d.pop(), Some(2));
    assert_eq!(d.pop(), Some(1));
    assert_eq!(d.pop(), None);
    assert!(d.is_empty());
}

#[test]
fn test_steal_fifo_order() {
    let d = Deque::new();
    let s = d.stealer();

    d.push(1);
    d.push(2);
    d.push(3);

    assert_eq!(s.steal(), Steal::Data(1));
    assert_eq!(s.steal(), Steal::Data(2));
    assert_eq!(s.steal(), Steal::Data(3));
    assert_eq!(s.steal(), Steal::Empty);
}

#[test]
fn test_mixed_pop_steal() {
    let d = Deque::new();
    let s = d.stealer();

    d.push(1);
    d.push(2);
    d.push(3);
    d.push(4);

    assert_eq!(d.pop(), Some(4));
    assert_eq!(s.steal(), Steal::Data(1));
    assert_eq!(d.pop(), Some(3));
    assert_eq!(s.steal(), Steal::Data(2));
    assert_eq!(d.pop(), None);
    assert_eq!(s.steal(), Steal::Empty);
}

#[test]
fn test_owner_local_steal() {
    let d = Deque::new();

    d.push(1);
    d.push(2);

    // The owner can take from the old end as well.
    assert_eq!(d.steal(), Steal::Data(1));
    assert_eq!(d.pop(), Some(2));
    assert_eq!(d.steal(), Steal::Empty);
}

#[test]
fn test_stealer_len_and_clone() {
    let d = Deque::new();
    let s1 = d.stealer();
    let s2 = s1.clone();

    assert!(s1.is_empty());

    d.push(10);
    d.push(20);

    assert_eq!(s1.len(), 2);
    assert_eq!(s2.len(), 2);
    assert!(!s2.is_empty());

    assert_eq!(s1.steal(), Steal::Data(10));
    assert_eq!(s2.steal(), Steal::Data(20));
    assert_eq!(s1.len(), 0);
}

#[test]
fn test_min_capacity_rounding() {
    assert_eq!(Deque::<i32>::new().capacity(), 16);
    assert_eq!(Deque::<i32>::with_min_capacity(0).capacity(), 16);
    assert_eq!(Deque::<i32>::with_min_capacity(4).capacity(), 16);
    assert_eq!(Deque::<i32>::with_min_capacity(16).capacity(), 16);
    assert_eq!(Deque::<i32>::with_min_capacity(20).capacity(), 32);
    assert_eq!(Deque::<i32>::with_min_capacity(64).capacity(), 64);
    assert_eq!(Deque::<i32>::with_min_capacity(1000).capacity(), 1024);
}

#[test]
fn test_grow() {
    let d = Deque::new();

    for i in 0..100 {
        d.push(i);
    }
    assert_eq!(d.len(), 100);
    assert_eq!(d.capacity(), 128);

    for i in (0..100).rev() {
        assert_eq!(d.pop(), Some(i));
    }
    assert_eq!(d.pop(), None);
}

#[test]
fn test_shrink_after_mass_pop() {
    let d = Deque::new();

    for i in 0..1000 {
        d.push(i);
    }
    assert_eq!(d.capacity(), 1024);

    for _ in 0..990 {
        d.pop().unwrap();
    }

    // The buffer has halved on the way down (1024 -> 32 for a live
    // range of 10) and never went below the minimum capacity.
    assert_eq!(d.capacity(), 32);
    assert_eq!(d.len(), 10);

    // Draining the rest takes it to the floor.
    while d.pop().is_some() {}
    assert_eq!(d.capacity(), 16);
}

#[test]
fn test_shrink_respects_min_capacity() {
    let d = Deque::with_min_capacity(64);

    for i in 0..1000 {
        d.push(i);
    }
    assert_eq!(d.capacity(), 1024);

    while d.pop().is_some() {}

    assert_eq!(d.capacity(), 64);
}

#[test]
fn test_wrap_around() {
    let d = Deque::new();

    // Cycle enough values through a small buffer that indices wrap
    // several times around its capacity.
    for i in 0..100 {
        d.push(i);
        assert_eq!(d.pop(), Some(i));
    }
    assert!(d.is_empty());
    assert_eq!(d.capacity(), 16);
}

#[test]
fn test_stealers_survive_owner() {
    let d = Deque::new();
    let s1 = d.stealer();
    let s2 = s1.clone();

    for i in 0..100 {
        d.push(i);
    }
    drop(d);

    let mut taken = 0;
    while taken < 100 {
        match if taken % 2 == 0 { s1.steal() } else { s2.steal() } {
            Steal::Data(_) => taken += 1,
            Steal::Empty => panic!("deque drained early"),
            Steal::Retry => {}
        }
    }

    assert_eq!(s1.steal(), Steal::Empty);
    assert_eq!(s2.steal(), Steal::Empty);
    assert_eq!(s1.len(), 0);
}

#[test]
fn test_steal_outcome_helpers() {
    assert_eq!(Steal::Data(7).success(), Some(7));
    assert_eq!(Steal::<i32>::Empty.success(), None);
    assert_eq!(Steal::<i32>::Retry.success(), None);

    assert!(Steal::<i32>::Empty.is_empty());
    assert!(!Steal::Data(7).is_empty());

    assert!(Steal::<i32>::Retry.is_retry());
    assert!(!Steal::Data(7).is_retry());
}

#[test]
fn test_debug_format() {
    let d: Deque<i32> = Deque::default();
    let s = d.stealer();

    assert_eq!(format!("{:?}", d), "Deque { .. }");
    assert_eq!(format!("{:?}", s), "Stealer { .. }");
    assert_eq!(format!("{:?}", Steal::Data(1)), "Data(1)");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use anon_pool_lib::*;
    use anyhow::{ensure, Result};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    type TestPool = Pool<Keccak256Hasher, WitnessVerifier<Keccak256Hasher>>;

    const RECIPIENT: Address = Address([0xDE; 20]);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }

    fn new_pool(config: PoolConfig) -> Result<TestPool> {
        init_tracing();
        Ok(Pool::new(
            config,
            Keccak256Hasher,
            WitnessVerifier::new(Keccak256Hasher),
        )?)
    }

    /// Build the withdraw proof for `note` against the pool's current root.
    fn prove_withdraw(
        pool: &TestPool,
        note: &Note,
        withdraw_amount: u64,
        change_note: Option<Note>,
    ) -> Result<Vec<u8>> {
        let commitment = note.commitment(pool.hasher());
        let leaf_index = pool
            .leaf_index_of(&commitment)?
            .ok_or_else(|| anyhow::anyhow!("note not in pool"))?;
        let witness = WithdrawWitness {
            note: note.clone(),
            merkle_proof: pool.membership_proof(leaf_index)?,
            root: pool.root()?,
            withdraw_amount,
            change_note,
        };
        Ok(witness.to_proof_bytes()?)
    }

    #[test]
    fn test_partial_withdrawal_conservation() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(8))?;
        let mut rng = StdRng::seed_from_u64(1);

        let note = Note::random(1_000_000, &mut rng);
        pool.deposit_note(&note)?;
        // Another depositor's note, so the balance is not just ours.
        pool.deposit_note(&Note::random(250_000, &mut rng))?;
        assert_eq!(pool.balance()?, 1_250_000);

        let change = Note::random(400_000, &mut rng);
        let proof = prove_withdraw(&pool, &note, 600_000, Some(change.clone()))?;
        let receipt = pool.withdraw(&proof, RECIPIENT)?;

        assert_eq!(receipt.amount, 600_000);
        assert_eq!(receipt.nullifier_hash, note.nullifier_hash(pool.hasher()));
        let remainder = receipt.remainder.expect("partial withdrawal leaves a remainder");
        assert_eq!(remainder.commitment, change.commitment(pool.hasher()));
        assert_eq!(remainder.leaf_index, 2);
        assert!(pool.has_commitment(&remainder.commitment)?);
        assert_eq!(pool.balance()?, 650_000);

        // The change note is spendable in turn.
        let proof = prove_withdraw(&pool, &change, 400_000, None)?;
        let receipt = pool.withdraw(&proof, RECIPIENT)?;
        assert_eq!(receipt.remainder, None);
        assert_eq!(pool.balance()?, 250_000);
        assert!(pool.is_spent(&change.nullifier_hash(pool.hasher()))?);
        Ok(())
    }

    #[test]
    fn test_no_double_spend() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(8))?;
        let mut rng = StdRng::seed_from_u64(2);
        let note = Note::random(1_000, &mut rng);
        pool.deposit_note(&note)?;
        pool.deposit_note(&Note::random(5_000, &mut rng))?;

        let proof = prove_withdraw(&pool, &note, 1_000, None)?;
        pool.withdraw(&proof, RECIPIENT)?;

        let again = pool.withdraw(&proof, RECIPIENT).unwrap_err();
        assert_eq!(again.kind(), RejectionKind::NullifierReused);

        // A different proof for the same note carries the same nullifier.
        let other = prove_withdraw(&pool, &note, 400, Some(Note::random(600, &mut rng)))?;
        let err = pool.withdraw(&other, RECIPIENT).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::NullifierReused);
        assert_eq!(pool.balance()?, 5_000);
        Ok(())
    }

    #[test]
    fn test_history_window() -> Result<()> {
        const K: usize = 5;
        let pool = new_pool(PoolConfig::default().with_depth(4).with_root_history_size(K))?;
        let empty_root = pool.root()?;

        let mut roots = Vec::new();
        for i in 0..=K as u64 {
            roots.push(pool.deposit(Field::from(100 + i), 10)?.root);
        }

        assert!(!pool.is_known_root(&empty_root)?);
        assert!(!pool.is_known_root(&roots[0])?);
        for root in &roots[1..] {
            assert!(pool.is_known_root(root)?);
        }
        Ok(())
    }

    #[test]
    fn test_stale_proof_rejected_after_window() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(6).with_root_history_size(3))?;
        let mut rng = StdRng::seed_from_u64(3);
        let note = Note::random(700, &mut rng);
        pool.deposit_note(&note)?;
        let proof = prove_withdraw(&pool, &note, 700, None)?;

        for _ in 0..3 {
            pool.deposit_note(&Note::random(1, &mut rng))?;
        }
        let err = pool.withdraw(&proof, RECIPIENT).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::ExpiredOrUnknownRoot);
        assert!(!pool.is_spent(&note.nullifier_hash(pool.hasher()))?);

        // Regenerating against the current root works.
        let fresh = prove_withdraw(&pool, &note, 700, None)?;
        pool.withdraw(&fresh, RECIPIENT)?;
        Ok(())
    }

    #[test]
    fn test_withdraw_within_window_uses_older_root() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(6).with_root_history_size(10))?;
        let mut rng = StdRng::seed_from_u64(4);
        let note = Note::random(300, &mut rng);
        pool.deposit_note(&note)?;
        let proof = prove_withdraw(&pool, &note, 300, None)?;
        pool.deposit_note(&Note::random(50, &mut rng))?;

        let receipt = pool.withdraw(&proof, RECIPIENT)?;
        assert_ne!(receipt.merkle_root, pool.root()?);
        Ok(())
    }

    #[test]
    fn test_root_determinism() -> Result<()> {
        let depth = 6;
        let zero = Field::from(0xDEADu64);
        let mut tree = CommitmentTree::new(Sha256Hasher, depth, zero);
        let mut rng = StdRng::seed_from_u64(5);
        let n = rng.gen_range(1..40);
        for _ in 0..n {
            tree.insert(Field(rng.gen()))?;
        }
        ensure!(tree.root() == compute_root(&Sha256Hasher, tree.leaves(), zero, depth));
        for i in 0..n {
            let proof = tree.prove_membership(i)?;
            let leaf = tree.leaves()[i as usize];
            ensure!(verify_merkle_proof(&Sha256Hasher, &leaf, &proof, &tree.root()));
        }
        Ok(())
    }

    #[test]
    fn test_depth_two_scenario_through_pool() -> Result<()> {
        init_tracing();
        let h = Sha256Hasher;
        let pool = Pool::new(
            PoolConfig::default().with_depth(2),
            h,
            WitnessVerifier::new(h),
        )?;
        let c1 = Field(keccak256(b"C1"));
        let c2 = Field(keccak256(b"C2"));
        pool.deposit(c1, 1)?;
        pool.deposit(c2, 1)?;

        let zero_pair = h.hash_two(&Field::ZERO, &Field::ZERO);
        assert_eq!(pool.root()?, h.hash_two(&h.hash_two(&c1, &c2), &zero_pair));
        let proof = pool.membership_proof(0)?;
        assert_eq!(proof.path_indices, vec![0, 0]);
        assert_eq!(proof.siblings, vec![c2, zero_pair]);
        ensure!(verify_merkle_proof(&h, &c1, &proof, &pool.root()?));
        Ok(())
    }

    #[test]
    fn test_capacity_enforcement() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(3))?;
        for i in 1..=8u64 {
            pool.deposit(Field::from(i), 1)?;
        }
        let root = pool.root()?;
        let err = pool.deposit(Field::from(9u64), 1).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::TreeFull);
        assert_eq!(pool.root()?, root);
        assert_eq!(pool.leaf_count()?, 8);
        assert_eq!(pool.balance()?, 8);
        Ok(())
    }

    #[test]
    fn test_empty_pool_has_valid_root() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(4))?;
        let root = pool.root()?;
        assert!(pool.is_known_root(&root)?);
        assert_eq!(pool.leaf_count()?, 0);
        assert_eq!(root, compute_zeros(&Keccak256Hasher, Field::ZERO, 4)[4]);
        Ok(())
    }

    #[test]
    fn test_hashers_are_not_interchangeable() -> Result<()> {
        let keccak_pool = new_pool(PoolConfig::default().with_depth(4))?;
        let sha_pool = Pool::new(
            PoolConfig::default().with_depth(4),
            Sha256Hasher,
            WitnessVerifier::new(Sha256Hasher),
        )?;
        let mut rng = StdRng::seed_from_u64(6);
        let note = Note::random(10, &mut rng);
        keccak_pool.deposit_note(&note)?;
        sha_pool.deposit_note(&note)?;
        assert_ne!(keccak_pool.root()?, sha_pool.root()?);

        let proof = prove_withdraw(&keccak_pool, &note, 10, None)?;
        let err = sha_pool.withdraw(&proof, RECIPIENT).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidProof);
        Ok(())
    }

    #[test]
    fn test_public_input_codec_round_trip() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let inputs = PublicInputs {
                withdraw_amount: u64::from(rng.gen::<u32>()),
                merkle_root: Field(rng.gen()),
                nullifier_hash: Field(rng.gen()),
                new_commitment: Field(rng.gen()),
            };
            let words = inputs.encode()?;
            assert_eq!(words.len(), PUBLIC_INPUT_WORDS);
            assert_eq!(PublicInputs::decode(&words)?, inputs);
        }

        let too_big = PublicInputs {
            withdraw_amount: 1 << 32,
            merkle_root: Field::ZERO,
            nullifier_hash: Field::ZERO,
            new_commitment: Field::ZERO,
        };
        assert!(matches!(too_big.encode(), Err(CodecError::OutOfRange { .. })));
        Ok(())
    }

    #[test]
    fn test_withdraw_witness_serialize_json() -> Result<()> {
        let pool = new_pool(PoolConfig::default().with_depth(4))?;
        let note = Note::new(1_000_000, Field([0x01u8; 32]), Field([0xABu8; 32]));
        pool.deposit_note(&note)?;

        let witness = WithdrawWitness {
            note: note.clone(),
            merkle_proof: pool.membership_proof(0)?,
            root: pool.root()?,
            withdraw_amount: 600_000,
            change_note: Some(Note::new(400_000, Field([0x05u8; 32]), Field([0x06u8; 32]))),
        };
        let json = serde_json::to_string_pretty(&witness)?;
        let parsed: WithdrawWitness = serde_json::from_str(&json)?;
        assert_eq!(parsed.note, note);
        assert_eq!(parsed.withdraw_amount, 600_000);
        assert_eq!(parsed.merkle_proof, witness.merkle_proof);
        assert!(json.contains(&hex::encode([0xABu8; 32])));
        Ok(())
    }

    #[test]
    fn test_concurrent_double_spend_single_winner() -> Result<()> {
        let pool = Arc::new(new_pool(PoolConfig::default().with_depth(8))?);
        let mut rng = StdRng::seed_from_u64(8);
        let note = Note::random(1_000, &mut rng);
        pool.deposit_note(&note)?;
        pool.deposit_note(&Note::random(10_000, &mut rng))?;
        let proof = Arc::new(prove_withdraw(&pool, &note, 1_000, None)?);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let proof = Arc::clone(&proof);
                thread::spawn(move || pool.withdraw(&proof, RECIPIENT))
            })
            .collect();

        let mut settled = 0;
        for handle in handles {
            match handle.join().expect("withdraw thread panicked") {
                Ok(_) => settled += 1,
                Err(e) => assert_eq!(e.kind(), RejectionKind::NullifierReused),
            }
        }
        assert_eq!(settled, 1);
        assert_eq!(pool.balance()?, 10_000);
        Ok(())
    }

    #[test]
    fn test_concurrent_deposits_get_distinct_indices() -> Result<()> {
        let pool = Arc::new(new_pool(PoolConfig::default().with_depth(10))?);
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    (0..25u64)
                        .map(|i| pool.deposit(Field::from(1 + t * 1000 + i), 3).map(|r| r.leaf_index))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut indices = Vec::new();
        for handle in handles {
            indices.extend(handle.join().expect("deposit thread panicked")?);
        }
        indices.sort_unstable();
        assert_eq!(indices, (0..100).collect::<Vec<u64>>());
        assert_eq!(pool.balance()?, 300);
        Ok(())
    }

    #[test]
    fn test_json_denomination_caps_withdrawal() -> Result<()> {
        let pool = new_pool(PoolConfig::from_json(r#"{ "depth": 5, "denomination": 1000 }"#)?)?;
        let mut rng = StdRng::seed_from_u64(10);

        // The pool only sees the deposited amount, not the value bound into
        // the commitment, so an oversized note can get in at the denomination.
        let oversized = Note::random(2000, &mut rng);
        pool.deposit(oversized.commitment(pool.hasher()), 1000)?;
        pool.deposit_note(&Note::random(1000, &mut rng))?;
        assert_eq!(pool.balance()?, 2000);

        let proof = prove_withdraw(&pool, &oversized, 2000, None)?;
        let err = pool.withdraw(&proof, RECIPIENT).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidAmount);
        assert!(!pool.is_spent(&oversized.nullifier_hash(pool.hasher()))?);
        assert_eq!(pool.balance()?, 2000);
        Ok(())
    }

    #[test]
    fn test_fixed_denomination_pool() -> Result<()> {
        let pool = new_pool(PoolConfig::from_json(r#"{ "depth": 5, "denomination": 1000 }"#)?)?;
        let mut rng = StdRng::seed_from_u64(9);
        let note = Note::random(1000, &mut rng);
        pool.deposit_note(&note)?;

        let err = pool.deposit_note(&Note::random(999, &mut rng)).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InvalidAmount);

        let proof = prove_withdraw(&pool, &note, 1000, None)?;
        pool.withdraw(&proof, RECIPIENT)?;
        assert_eq!(pool.balance()?, 0);
        Ok(())
    }
}

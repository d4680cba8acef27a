//! Builtin functions of untyped Plutus Core.
//!
//! Each builtin has a stable 7-bit Flat tag, a fixed number of term
//! arguments and a number of type instantiations (`force`s) that must be
//! applied before the first term argument.

use std::fmt;

/// A builtin function, numbered by its Flat tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefaultFunction {
    // ── Integers ──
    AddInteger = 0,
    SubtractInteger = 1,
    MultiplyInteger = 2,
    DivideInteger = 3,
    QuotientInteger = 4,
    RemainderInteger = 5,
    ModInteger = 6,
    EqualsInteger = 7,
    LessThanInteger = 8,
    LessThanEqualsInteger = 9,

    // ── Bytestrings ──
    AppendByteString = 10,
    ConsByteString = 11,
    SliceByteString = 12,
    LengthOfByteString = 13,
    IndexByteString = 14,
    EqualsByteString = 15,
    LessThanByteString = 16,
    LessThanEqualsByteString = 17,

    // ── Cryptography ──
    Sha2_256 = 18,
    Sha3_256 = 19,
    Blake2b_256 = 20,
    VerifyEd25519Signature = 21,

    // ── Strings ──
    AppendString = 22,
    EqualsString = 23,
    EncodeUtf8 = 24,
    DecodeUtf8 = 25,

    // ── Control ──
    IfThenElse = 26,
    ChooseUnit = 27,
    Trace = 28,

    // ── Pairs ──
    FstPair = 29,
    SndPair = 30,

    // ── Lists ──
    ChooseList = 31,
    MkCons = 32,
    HeadList = 33,
    TailList = 34,
    NullList = 35,

    // ── Data ──
    ChooseData = 36,
    ConstrData = 37,
    MapData = 38,
    ListData = 39,
    IData = 40,
    BData = 41,
    UnConstrData = 42,
    UnMapData = 43,
    UnListData = 44,
    UnIData = 45,
    UnBData = 46,
    EqualsData = 47,
    MkPairData = 48,
    MkNilData = 49,
    MkNilPairData = 50,
    SerialiseData = 51,
    VerifyEcdsaSecp256k1Signature = 52,
    VerifySchnorrSecp256k1Signature = 53,
}

use DefaultFunction::*;

impl DefaultFunction {
    /// Every builtin in tag order.
    pub const ALL: [DefaultFunction; 54] = [
        AddInteger,
        SubtractInteger,
        MultiplyInteger,
        DivideInteger,
        QuotientInteger,
        RemainderInteger,
        ModInteger,
        EqualsInteger,
        LessThanInteger,
        LessThanEqualsInteger,
        AppendByteString,
        ConsByteString,
        SliceByteString,
        LengthOfByteString,
        IndexByteString,
        EqualsByteString,
        LessThanByteString,
        LessThanEqualsByteString,
        Sha2_256,
        Sha3_256,
        Blake2b_256,
        VerifyEd25519Signature,
        AppendString,
        EqualsString,
        EncodeUtf8,
        DecodeUtf8,
        IfThenElse,
        ChooseUnit,
        Trace,
        FstPair,
        SndPair,
        ChooseList,
        MkCons,
        HeadList,
        TailList,
        NullList,
        ChooseData,
        ConstrData,
        MapData,
        ListData,
        IData,
        BData,
        UnConstrData,
        UnMapData,
        UnListData,
        UnIData,
        UnBData,
        EqualsData,
        MkPairData,
        MkNilData,
        MkNilPairData,
        SerialiseData,
        VerifyEcdsaSecp256k1Signature,
        VerifySchnorrSecp256k1Signature,
    ];

    /// Flat tag (7 bits).
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Number of term arguments.
    pub fn arity(self) -> usize {
        match self {
            LengthOfByteString | Sha2_256 | Sha3_256 | Blake2b_256 | EncodeUtf8 | DecodeUtf8
            | FstPair | SndPair | HeadList | TailList | NullList | MapData | ListData | IData
            | BData | UnConstrData | UnMapData | UnListData | UnIData | UnBData | MkNilData
            | MkNilPairData | SerialiseData => 1,

            SliceByteString
            | VerifyEd25519Signature
            | IfThenElse
            | ChooseList
            | VerifyEcdsaSecp256k1Signature
            | VerifySchnorrSecp256k1Signature => 3,

            ChooseData => 6,

            _ => 2,
        }
    }

    /// Number of type instantiations expected before the first argument.
    pub fn force_count(self) -> u32 {
        match self {
            IfThenElse | ChooseUnit | Trace | MkCons | HeadList | TailList | NullList
            | ChooseData => 1,
            FstPair | SndPair | ChooseList => 2,
            _ => 0,
        }
    }

    /// Name as written in the textual syntax.
    pub fn name(self) -> &'static str {
        match self {
            AddInteger => "addInteger",
            SubtractInteger => "subtractInteger",
            MultiplyInteger => "multiplyInteger",
            DivideInteger => "divideInteger",
            QuotientInteger => "quotientInteger",
            RemainderInteger => "remainderInteger",
            ModInteger => "modInteger",
            EqualsInteger => "equalsInteger",
            LessThanInteger => "lessThanInteger",
            LessThanEqualsInteger => "lessThanEqualsInteger",
            AppendByteString => "appendByteString",
            ConsByteString => "consByteString",
            SliceByteString => "sliceByteString",
            LengthOfByteString => "lengthOfByteString",
            IndexByteString => "indexByteString",
            EqualsByteString => "equalsByteString",
            LessThanByteString => "lessThanByteString",
            LessThanEqualsByteString => "lessThanEqualsByteString",
            Sha2_256 => "sha2_256",
            Sha3_256 => "sha3_256",
            Blake2b_256 => "blake2b_256",
            VerifyEd25519Signature => "verifyEd25519Signature",
            AppendString => "appendString",
            EqualsString => "equalsString",
            EncodeUtf8 => "encodeUtf8",
            DecodeUtf8 => "decodeUtf8",
            IfThenElse => "ifThenElse",
            ChooseUnit => "chooseUnit",
            Trace => "trace",
            FstPair => "fstPair",
            SndPair => "sndPair",
            ChooseList => "chooseList",
            MkCons => "mkCons",
            HeadList => "headList",
            TailList => "tailList",
            NullList => "nullList",
            ChooseData => "chooseData",
            ConstrData => "constrData",
            MapData => "mapData",
            ListData => "listData",
            IData => "iData",
            BData => "bData",
            UnConstrData => "unConstrData",
            UnMapData => "unMapData",
            UnListData => "unListData",
            UnIData => "unIData",
            UnBData => "unBData",
            EqualsData => "equalsData",
            MkPairData => "mkPairData",
            MkNilData => "mkNilData",
            MkNilPairData => "mkNilPairData",
            SerialiseData => "serialiseData",
            VerifyEcdsaSecp256k1Signature => "verifyEcdsaSecp256k1Signature",
            VerifySchnorrSecp256k1Signature => "verifySchnorrSecp256k1Signature",
        }
    }
}

impl fmt::Display for DefaultFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_declaration_order() {
        for (i, fun) in DefaultFunction::ALL.iter().enumerate() {
            assert_eq!(fun.tag() as usize, i, "{} out of place", fun);
            assert_eq!(DefaultFunction::from_tag(i as u8), Some(*fun));
        }
        assert_eq!(DefaultFunction::from_tag(54), None);
        assert_eq!(DefaultFunction::from_tag(127), None);
    }

    #[test]
    fn polymorphic_builtins_need_forces() {
        assert_eq!(IfThenElse.force_count(), 1);
        assert_eq!(IfThenElse.arity(), 3);
        assert_eq!(FstPair.force_count(), 2);
        assert_eq!(ChooseList.force_count(), 2);
        assert_eq!(AddInteger.force_count(), 0);
        assert_eq!(ChooseData.arity(), 6);
        assert_eq!(Trace.arity(), 2);
    }
}

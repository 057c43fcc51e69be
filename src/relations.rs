//! Relation-type catalogues and inverse resolution.
//!
//! Three disjoint relation spaces exist: synset-to-synset, sense-to-sense
//! and sense-to-synset. Each is a closed enumeration; `inverse()` is a total
//! function over the catalogue returning `None` for the directed tail
//! (`also`, `pertainym`, `participle`, `other`, the morphosemantic sense
//! links). Symmetric types map to themselves.

use serde::{Deserialize, Serialize};

macro_rules! relation_catalogue {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Every member of the catalogue, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Unknown {} relation type: {}", stringify!($name), s)),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

relation_catalogue! {
    /// Types of relationships between synsets (85 entries).
    SynsetRelType {
        Agent => "agent",
        Also => "also",
        Attribute => "attribute",
        BeInState => "be_in_state",
        Causes => "causes",
        ClassifiedBy => "classified_by",
        Classifies => "classifies",
        CoAgentInstrument => "co_agent_instrument",
        CoAgentPatient => "co_agent_patient",
        CoAgentResult => "co_agent_result",
        CoInstrumentAgent => "co_instrument_agent",
        CoInstrumentPatient => "co_instrument_patient",
        CoInstrumentResult => "co_instrument_result",
        CoPatientAgent => "co_patient_agent",
        CoPatientInstrument => "co_patient_instrument",
        CoResultAgent => "co_result_agent",
        CoResultInstrument => "co_result_instrument",
        CoRole => "co_role",
        Direction => "direction",
        DomainRegion => "domain_region",
        DomainTopic => "domain_topic",
        Exemplifies => "exemplifies",
        Entails => "entails",
        EqSynonym => "eq_synonym",
        HasDomainRegion => "has_domain_region",
        HasDomainTopic => "has_domain_topic",
        IsExemplifiedBy => "is_exemplified_by",
        HoloLocation => "holo_location",
        HoloMember => "holo_member",
        HoloPart => "holo_part",
        HoloPortion => "holo_portion",
        HoloSubstance => "holo_substance",
        Holonym => "holonym",
        Hypernym => "hypernym",
        Hyponym => "hyponym",
        InManner => "in_manner",
        InstanceHypernym => "instance_hypernym",
        InstanceHyponym => "instance_hyponym",
        Instrument => "instrument",
        Involved => "involved",
        InvolvedAgent => "involved_agent",
        InvolvedDirection => "involved_direction",
        InvolvedInstrument => "involved_instrument",
        InvolvedLocation => "involved_location",
        InvolvedPatient => "involved_patient",
        InvolvedResult => "involved_result",
        InvolvedSourceDirection => "involved_source_direction",
        InvolvedTargetDirection => "involved_target_direction",
        IsCausedBy => "is_caused_by",
        IsEntailedBy => "is_entailed_by",
        Location => "location",
        MannerOf => "manner_of",
        MeroLocation => "mero_location",
        MeroMember => "mero_member",
        MeroPart => "mero_part",
        MeroPortion => "mero_portion",
        MeroSubstance => "mero_substance",
        Meronym => "meronym",
        Similar => "similar",
        Other => "other",
        StateOf => "state_of",
        Patient => "patient",
        RestrictedBy => "restricted_by",
        Restricts => "restricts",
        Result => "result",
        Role => "role",
        SourceDirection => "source_direction",
        Subevent => "subevent",
        IsSubeventOf => "is_subevent_of",
        TargetDirection => "target_direction",
        AntoGradable => "anto_gradable",
        AntoSimple => "anto_simple",
        AntoConverse => "anto_converse",
        Antonym => "antonym",
        IrSynonym => "ir_synonym",
        Feminine => "feminine",
        HasFeminine => "has_feminine",
        Masculine => "masculine",
        HasMasculine => "has_masculine",
        Young => "young",
        HasYoung => "has_young",
        Diminutive => "diminutive",
        HasDiminutive => "has_diminutive",
        Augmentative => "augmentative",
        HasAugmentative => "has_augmentative",
    }
}

relation_catalogue! {
    /// Types of relationships between senses (48 entries).
    SenseRelType {
        Antonym => "antonym",
        Also => "also",
        Participle => "participle",
        Pertainym => "pertainym",
        Derivation => "derivation",
        DomainTopic => "domain_topic",
        HasDomainTopic => "has_domain_topic",
        DomainRegion => "domain_region",
        HasDomainRegion => "has_domain_region",
        Exemplifies => "exemplifies",
        IsExemplifiedBy => "is_exemplified_by",
        Similar => "similar",
        Other => "other",
        SimpleAspectIp => "simple_aspect_ip",
        SecondaryAspectIp => "secondary_aspect_ip",
        SimpleAspectPi => "simple_aspect_pi",
        SecondaryAspectPi => "secondary_aspect_pi",
        Feminine => "feminine",
        HasFeminine => "has_feminine",
        Masculine => "masculine",
        HasMasculine => "has_masculine",
        Young => "young",
        HasYoung => "has_young",
        Diminutive => "diminutive",
        HasDiminutive => "has_diminutive",
        Augmentative => "augmentative",
        HasAugmentative => "has_augmentative",
        AntoGradable => "anto_gradable",
        AntoSimple => "anto_simple",
        AntoConverse => "anto_converse",
        Metaphor => "metaphor",
        HasMetaphor => "has_metaphor",
        Metonym => "metonym",
        HasMetonym => "has_metonym",
        Agent => "agent",
        Material => "material",
        Event => "event",
        Instrument => "instrument",
        Location => "location",
        ByMeansOf => "by_means_of",
        Undergoer => "undergoer",
        Property => "property",
        Result => "result",
        State => "state",
        Uses => "uses",
        Destination => "destination",
        BodyPart => "body_part",
        Vehicle => "vehicle",
    }
}

relation_catalogue! {
    /// Types of relationships from a sense to a synset (4 entries).
    SenseSynsetRelType {
        DomainTopic => "domain_topic",
        DomainRegion => "domain_region",
        Exemplifies => "exemplifies",
        Other => "other",
    }
}

impl SynsetRelType {
    /// The inverse type, if one is defined. Symmetric types return
    /// themselves; `also` and `other` are directed with no inverse.
    pub fn inverse(&self) -> Option<SynsetRelType> {
        use SynsetRelType::*;
        Some(match self {
            Agent => InvolvedAgent,
            InvolvedAgent => Agent,
            BeInState => StateOf,
            StateOf => BeInState,
            Causes => IsCausedBy,
            IsCausedBy => Causes,
            ClassifiedBy => Classifies,
            Classifies => ClassifiedBy,
            CoAgentInstrument => CoInstrumentAgent,
            CoInstrumentAgent => CoAgentInstrument,
            CoAgentPatient => CoPatientAgent,
            CoPatientAgent => CoAgentPatient,
            CoAgentResult => CoResultAgent,
            CoResultAgent => CoAgentResult,
            CoInstrumentPatient => CoPatientInstrument,
            CoPatientInstrument => CoInstrumentPatient,
            CoInstrumentResult => CoResultInstrument,
            CoResultInstrument => CoInstrumentResult,
            Direction => InvolvedDirection,
            InvolvedDirection => Direction,
            DomainRegion => HasDomainRegion,
            HasDomainRegion => DomainRegion,
            DomainTopic => HasDomainTopic,
            HasDomainTopic => DomainTopic,
            Exemplifies => IsExemplifiedBy,
            IsExemplifiedBy => Exemplifies,
            Entails => IsEntailedBy,
            IsEntailedBy => Entails,
            HoloLocation => MeroLocation,
            MeroLocation => HoloLocation,
            HoloMember => MeroMember,
            MeroMember => HoloMember,
            HoloPart => MeroPart,
            MeroPart => HoloPart,
            HoloPortion => MeroPortion,
            MeroPortion => HoloPortion,
            HoloSubstance => MeroSubstance,
            MeroSubstance => HoloSubstance,
            Holonym => Meronym,
            Meronym => Holonym,
            Hypernym => Hyponym,
            Hyponym => Hypernym,
            InManner => MannerOf,
            MannerOf => InManner,
            InstanceHypernym => InstanceHyponym,
            InstanceHyponym => InstanceHypernym,
            Instrument => InvolvedInstrument,
            InvolvedInstrument => Instrument,
            Involved => Role,
            Role => Involved,
            Location => InvolvedLocation,
            InvolvedLocation => Location,
            Patient => InvolvedPatient,
            InvolvedPatient => Patient,
            Result => InvolvedResult,
            InvolvedResult => Result,
            SourceDirection => InvolvedSourceDirection,
            InvolvedSourceDirection => SourceDirection,
            TargetDirection => InvolvedTargetDirection,
            InvolvedTargetDirection => TargetDirection,
            RestrictedBy => Restricts,
            Restricts => RestrictedBy,
            Subevent => IsSubeventOf,
            IsSubeventOf => Subevent,
            Feminine => HasFeminine,
            HasFeminine => Feminine,
            Masculine => HasMasculine,
            HasMasculine => Masculine,
            Young => HasYoung,
            HasYoung => Young,
            Diminutive => HasDiminutive,
            HasDiminutive => Diminutive,
            Augmentative => HasAugmentative,
            HasAugmentative => Augmentative,
            // Symmetric: adding one still inserts both directions.
            Antonym => Antonym,
            Similar => Similar,
            EqSynonym => EqSynonym,
            Attribute => Attribute,
            CoRole => CoRole,
            AntoGradable => AntoGradable,
            AntoSimple => AntoSimple,
            AntoConverse => AntoConverse,
            IrSynonym => IrSynonym,
            Also | Other => return None,
        })
    }

    pub fn is_symmetric(&self) -> bool {
        self.inverse() == Some(*self)
    }
}

impl SenseRelType {
    /// The inverse type, if one is defined. The morphosemantic links
    /// (`agent` through `vehicle`) and `also`/`participle`/`pertainym`/
    /// `other` are directed with no inverse.
    pub fn inverse(&self) -> Option<SenseRelType> {
        use SenseRelType::*;
        Some(match self {
            DomainTopic => HasDomainTopic,
            HasDomainTopic => DomainTopic,
            DomainRegion => HasDomainRegion,
            HasDomainRegion => DomainRegion,
            Exemplifies => IsExemplifiedBy,
            IsExemplifiedBy => Exemplifies,
            SimpleAspectIp => SimpleAspectPi,
            SimpleAspectPi => SimpleAspectIp,
            SecondaryAspectIp => SecondaryAspectPi,
            SecondaryAspectPi => SecondaryAspectIp,
            Feminine => HasFeminine,
            HasFeminine => Feminine,
            Masculine => HasMasculine,
            HasMasculine => Masculine,
            Young => HasYoung,
            HasYoung => Young,
            Diminutive => HasDiminutive,
            HasDiminutive => Diminutive,
            Augmentative => HasAugmentative,
            HasAugmentative => Augmentative,
            Metaphor => HasMetaphor,
            HasMetaphor => Metaphor,
            Metonym => HasMetonym,
            HasMetonym => Metonym,
            Antonym => Antonym,
            Similar => Similar,
            Derivation => Derivation,
            AntoGradable => AntoGradable,
            AntoSimple => AntoSimple,
            AntoConverse => AntoConverse,
            Also | Participle | Pertainym | Other => return None,
            Agent | Material | Event | Instrument | Location | ByMeansOf | Undergoer
            | Property | Result | State | Uses | Destination | BodyPart | Vehicle => return None,
        })
    }

    pub fn is_symmetric(&self) -> bool {
        self.inverse() == Some(*self)
    }
}

impl SenseSynsetRelType {
    /// Sense-to-synset edges never have an automatic inverse: the opposite
    /// direction would live in a relation space that does not exist.
    pub fn inverse(&self) -> Option<SenseSynsetRelType> {
        None
    }
}

/// True when `s` names a valid synset-to-synset relation type.
pub fn is_synset_rel_type(s: &str) -> bool {
    s.parse::<SynsetRelType>().is_ok()
}

/// True when `s` names a valid sense-to-sense relation type.
pub fn is_sense_rel_type(s: &str) -> bool {
    s.parse::<SenseRelType>().is_ok()
}

/// True when `s` names a valid sense-to-synset relation type.
pub fn is_sense_synset_rel_type(s: &str) -> bool {
    s.parse::<SenseSynsetRelType>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_sizes_are_fixed() {
        assert_eq!(SynsetRelType::ALL.len(), 85);
        assert_eq!(SenseRelType::ALL.len(), 48);
        assert_eq!(SenseSynsetRelType::ALL.len(), 4);
    }

    #[test]
    fn synset_inverse_is_an_involution() {
        for t in SynsetRelType::ALL {
            if let Some(inv) = t.inverse() {
                assert_eq!(inv.inverse(), Some(*t), "{} is not involutive", t);
            }
        }
    }

    #[test]
    fn sense_inverse_is_an_involution() {
        for t in SenseRelType::ALL {
            if let Some(inv) = t.inverse() {
                assert_eq!(inv.inverse(), Some(*t), "{} is not involutive", t);
            }
        }
    }

    #[test]
    fn symmetric_classes_match_catalogue() {
        use SynsetRelType as S;
        let symmetric: Vec<_> = S::ALL.iter().filter(|t| t.is_symmetric()).collect();
        assert_eq!(
            symmetric,
            vec![
                &S::Attribute,
                &S::CoRole,
                &S::EqSynonym,
                &S::Similar,
                &S::AntoGradable,
                &S::AntoSimple,
                &S::AntoConverse,
                &S::Antonym,
                &S::IrSynonym,
            ]
        );
        assert!(SenseRelType::Derivation.is_symmetric());
        assert!(SenseRelType::Antonym.is_symmetric());
        assert!(!SenseRelType::Pertainym.is_symmetric());
    }

    #[test]
    fn directed_tail_has_no_inverse() {
        assert_eq!(SynsetRelType::Also.inverse(), None);
        assert_eq!(SynsetRelType::Other.inverse(), None);
        assert_eq!(SenseRelType::Also.inverse(), None);
        assert_eq!(SenseRelType::Pertainym.inverse(), None);
        assert_eq!(SenseRelType::Participle.inverse(), None);
        assert_eq!(SenseRelType::Other.inverse(), None);
        for t in SenseSynsetRelType::ALL {
            assert_eq!(t.inverse(), None);
        }
    }

    #[test]
    fn strings_round_trip_for_every_type() {
        for t in SynsetRelType::ALL {
            assert_eq!(t.as_str().parse::<SynsetRelType>(), Ok(*t));
        }
        for t in SenseRelType::ALL {
            assert_eq!(t.as_str().parse::<SenseRelType>(), Ok(*t));
        }
        for t in SenseSynsetRelType::ALL {
            assert_eq!(t.as_str().parse::<SenseSynsetRelType>(), Ok(*t));
        }
        assert!("not_a_relation".parse::<SynsetRelType>().is_err());
    }

    #[test]
    fn hierarchy_pairs_resolve() {
        assert_eq!(
            SynsetRelType::Hypernym.inverse(),
            Some(SynsetRelType::Hyponym)
        );
        assert_eq!(
            SynsetRelType::MeroPart.inverse(),
            Some(SynsetRelType::HoloPart)
        );
        assert_eq!(
            SenseRelType::Exemplifies.inverse(),
            Some(SenseRelType::IsExemplifiedBy)
        );
    }
}
